//! Capped persistent store sink backed by a JSON file

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{Sink, SinkError};
use crate::event::LogEntry;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Keeps the most recent entries, newest first, as a JSON array at a fixed
/// path, for later inspection. Oldest entries beyond the cap are dropped
/// silently. An absent or unreadable store reads as empty.
pub struct StoreSink {
    path: PathBuf,
    max_entries: usize,
    // Serializes the read-modify-write cycle across threads.
    write_lock: Mutex<()>,
}

impl StoreSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Stored entries, newest first. Absent or corrupt stores read as empty.
    pub fn entries(&self) -> Vec<LogEntry> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Remove the store. Missing stores are a no-op.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "failed to clear log store: {error}");
            }
        }
    }
}

impl Sink for StoreSink {
    fn name(&self) -> &str {
        "store"
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut entries = self.entries();
        entries.insert(0, entry.clone());
        entries.truncate(self.max_entries);

        let bytes = serde_json::to_vec(&entries)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LogEntry, LogLevel};

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    #[test]
    fn test_entries_newest_first_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StoreSink::new(dir.path().join("logs.json")).with_max_entries(10);

        for i in 0..15 {
            sink.log(&entry(&format!("m{}", i))).unwrap();
        }

        let stored = sink.entries();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0].message, "m14");
        assert_eq!(stored[9].message, "m5");
    }

    #[test]
    fn test_absent_store_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StoreSink::new(dir.path().join("missing.json"));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_clear_tolerates_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StoreSink::new(dir.path().join("logs.json"));

        sink.clear();

        sink.log(&entry("kept")).unwrap();
        assert_eq!(sink.entries().len(), 1);
        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_corrupt_store_reads_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.json");
        fs::write(&path, b"not json").unwrap();

        let sink = StoreSink::new(&path);
        assert!(sink.entries().is_empty());

        sink.log(&entry("fresh")).unwrap();
        assert_eq!(sink.entries()[0].message, "fresh");
    }
}
