//! Pluggable log delivery sinks

pub mod buffer;
pub mod console;
pub mod store;

pub use buffer::{BufferedSink, FlushCallback};
pub use console::ConsoleSink;
pub use store::StoreSink;

use thiserror::Error;

use crate::event::{LogEntry, LogLevel};

/// Error raised by a sink. The logger catches these and reports them through
/// its fallback channel; they never reach logging call sites.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("flush callback failed: {0}")]
    Callback(#[from] anyhow::Error),
}

/// Capability interface implemented by every sink.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    /// Sink-level filter, applied after the logger's own threshold.
    fn should_log(&self, _level: LogLevel) -> bool {
        true
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError>;

    /// Deliver anything the sink has buffered.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
