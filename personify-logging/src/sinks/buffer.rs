//! Batching sink with size- and interval-triggered flushing

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Sink, SinkError};
use crate::event::LogEntry;

pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Callback invoked with each flushed batch. Delivery is owned by the host
/// application (network upload, analytics pipeline, ...).
pub type FlushCallback = Arc<dyn Fn(Vec<LogEntry>) -> anyhow::Result<()> + Send + Sync>;

/// Queues entries and delivers them in batches.
///
/// A flush is triggered when the queue reaches `max_buffer_size`, on the
/// background interval (when one was spawned), or explicitly. The batch is
/// removed from the buffer before the callback runs; a failing callback is
/// reported and the batch is dropped. Delivery is best-effort, not
/// at-least-once.
pub struct BufferedSink {
    max_buffer_size: usize,
    buffer: Mutex<Vec<LogEntry>>,
    callback: FlushCallback,
}

impl BufferedSink {
    pub fn new(callback: FlushCallback) -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            buffer: Mutex::new(Vec::new()),
            callback,
        }
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size.max(1);
        self
    }

    /// Spawn a background task flushing every `interval`, independent of the
    /// buffer size trigger. The task holds only a weak handle and exits once
    /// the sink is dropped. Requires an ambient tokio runtime; without one the
    /// interval trigger is disabled and size-triggered flushing still applies.
    pub fn spawn_interval_flush(self: &Arc<Self>, interval: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime; buffered sink interval flush disabled");
            return;
        };

        let weak = Arc::downgrade(self);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(sink) => sink.flush_now(),
                    None => break,
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.lock_buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_buffer().is_empty()
    }

    /// Snapshot and clear the buffer, then hand the batch to the callback.
    /// Callback failures are reported and the batch is lost.
    pub fn flush_now(&self) {
        let batch = std::mem::take(&mut *self.lock_buffer());
        if batch.is_empty() {
            return;
        }

        let dropped = batch.len();
        if let Err(error) = (self.callback)(batch) {
            tracing::warn!(
                entries = dropped,
                "buffered sink flush callback failed, batch dropped: {error:#}"
            );
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for BufferedSink {
    fn name(&self) -> &str {
        "buffered"
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let should_flush = {
            let mut buffer = self.lock_buffer();
            buffer.push(entry.clone());
            buffer.len() >= self.max_buffer_size
        };
        if should_flush {
            self.flush_now();
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.flush_now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LogEntry, LogLevel};

    fn capture_callback() -> (FlushCallback, Arc<Mutex<Vec<Vec<LogEntry>>>>) {
        let batches: Arc<Mutex<Vec<Vec<LogEntry>>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&batches);
        let callback: FlushCallback = Arc::new(move |batch| {
            captured.lock().unwrap().push(batch);
            Ok(())
        });
        (callback, batches)
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    #[test]
    fn test_flush_triggered_at_max_buffer_size() {
        let (callback, batches) = capture_callback();
        let sink = BufferedSink::new(callback).with_max_buffer_size(3);

        sink.log(&entry("a")).unwrap();
        sink.log(&entry("b")).unwrap();
        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(sink.len(), 2);

        sink.log(&entry("c")).unwrap();
        let flushed = batches.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        let messages: Vec<_> = flushed[0].iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_failing_callback_drops_batch_without_panicking() {
        let callback: FlushCallback = Arc::new(|_| anyhow::bail!("sink offline"));
        let sink = BufferedSink::new(callback).with_max_buffer_size(2);

        sink.log(&entry("a")).unwrap();
        sink.log(&entry("b")).unwrap();

        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_explicit_flush_empties_partial_buffer() {
        let (callback, batches) = capture_callback();
        let sink = BufferedSink::new(callback);

        sink.log(&entry("only")).unwrap();
        sink.flush().unwrap();

        assert_eq!(batches.lock().unwrap().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_flush_with_empty_buffer_skips_callback() {
        let (callback, batches) = capture_callback();
        let sink = BufferedSink::new(callback);

        sink.flush_now();
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_flush() {
        let (callback, batches) = capture_callback();
        let sink = Arc::new(BufferedSink::new(callback));
        sink.spawn_interval_flush(Duration::from_secs(5));

        sink.log(&entry("queued")).unwrap();
        // Let the interval task initialize before moving the paused clock.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert_eq!(batches.lock().unwrap().len(), 1);
        assert!(sink.is_empty());
    }
}
