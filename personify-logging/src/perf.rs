//! Stopwatch-style performance measurement

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Elapsed metrics attached to log entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Elapsed wall-clock time, rounded to two decimal places.
    pub duration_ms: f64,
    /// Resident memory of the process in megabytes, when the platform
    /// exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PerfError {
    #[error("unknown performance mark: {0}")]
    UnknownMark(String),
}

/// Stopwatch with named marks.
///
/// `end` without a prior `start` reports a zero duration rather than failing;
/// `measure` referencing a mark that was never recorded is the one operation
/// that errors.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    started: Option<Instant>,
    marks: HashMap<String, Instant>,
    measures: HashMap<String, f64>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start instant, overwriting any prior state.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Metrics from the start instant to now. Duration is 0 when `start` was
    /// never called.
    pub fn end(&self) -> PerformanceMetrics {
        let duration_ms = self
            .started
            .map(|started| round2(started.elapsed().as_secs_f64() * 1000.0))
            .unwrap_or(0.0);
        PerformanceMetrics {
            duration_ms,
            memory_mb: current_memory_mb(),
            timestamp: Utc::now(),
        }
    }

    /// Record a named instant for later interval measurement.
    pub fn mark(&mut self, name: impl Into<String>) {
        self.marks.insert(name.into(), Instant::now());
    }

    /// Elapsed milliseconds between two marks, a mark and now, or the start
    /// instant and now when both marks are omitted. The result is also
    /// recorded under `name`.
    pub fn measure(
        &mut self,
        name: impl Into<String>,
        start_mark: Option<&str>,
        end_mark: Option<&str>,
    ) -> Result<f64, PerfError> {
        let start = match start_mark {
            Some(mark) => *self
                .marks
                .get(mark)
                .ok_or_else(|| PerfError::UnknownMark(mark.to_string()))?,
            None => self.started.unwrap_or_else(Instant::now),
        };
        let end = match end_mark {
            Some(mark) => *self
                .marks
                .get(mark)
                .ok_or_else(|| PerfError::UnknownMark(mark.to_string()))?,
            None => Instant::now(),
        };

        let duration_ms = round2(end.saturating_duration_since(start).as_secs_f64() * 1000.0);
        self.measures.insert(name.into(), duration_ms);
        Ok(duration_ms)
    }

    /// Recorded measures, by name.
    pub fn measures(&self) -> &HashMap<String, f64> {
        &self.measures
    }

    /// Clear the start instant and all marks and measures.
    pub fn reset(&mut self) {
        self.started = None;
        self.marks.clear();
        self.measures.clear();
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Best-effort resident memory of the current process, in megabytes.
pub(crate) fn current_memory_mb() -> Option<f64> {
    let pid = sysinfo::Pid::from_u32(std::process::id());
    let mut system = sysinfo::System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|process| round2(process.memory() as f64 / (1024.0 * 1024.0)))
}
