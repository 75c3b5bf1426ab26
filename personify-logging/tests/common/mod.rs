//! Shared test sink capturing dispatched entries
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use personify_logging::{LogEntry, LogLevel, Sink, SinkError};

pub struct CaptureSink {
    name: String,
    min_level: Option<LogLevel>,
    fail: bool,
    entries: Mutex<Vec<LogEntry>>,
}

impl CaptureSink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            min_level: None,
            fail: false,
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn with_min_level(name: &str, min_level: LogLevel) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            min_level: Some(min_level),
            fail: false,
            entries: Mutex::new(Vec::new()),
        })
    }

    /// A sink whose `log` always fails, for fan-out isolation tests.
    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            min_level: None,
            fail: true,
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_log(&self, level: LogLevel) -> bool {
        self.min_level.map(|min| level >= min).unwrap_or(true)
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Io(std::io::Error::other("sink broken")));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
