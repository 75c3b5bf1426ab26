//! Level-colored console sink

use colored::Colorize;

use super::{Sink, SinkError};
use crate::event::{LogEntry, LogLevel};

/// Immediate, synchronous console output with its own minimum level.
///
/// `Warn` and `Error` entries go to stderr, everything else to stdout.
pub struct ConsoleSink {
    min_level: LogLevel,
    use_json: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
            use_json: false,
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Emit entries as single-line JSON instead of the human-readable format.
    pub fn with_json(mut self, use_json: bool) -> Self {
        self.use_json = use_json;
        self
    }

    fn format_line(&self, entry: &LogEntry) -> String {
        let level = match entry.level {
            LogLevel::Debug => "DEBUG".cyan().to_string(),
            LogLevel::Info => "INFO".green().to_string(),
            LogLevel::Warn => "WARN".yellow().to_string(),
            LogLevel::Error => "ERROR".red().bold().to_string(),
        };

        let mut line = format!(
            "{} [{}] {}",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            level,
            entry.message
        );

        if let Some(request_id) = &entry.request_id {
            line.push_str(&format!(" request_id={}", request_id));
        }
        if !entry.context.is_empty() {
            let mut keys: Vec<_> = entry.context.keys().collect();
            keys.sort();
            for key in keys {
                line.push_str(&format!(" {}={}", key, entry.context[key]));
            }
        }
        if let Some(metrics) = &entry.performance {
            line.push_str(&format!(" duration_ms={}", metrics.duration_ms));
        }
        if let Some(error) = &entry.error {
            line.push_str(&format!(" error={}: {}", error.name, error.message));
        }

        line
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let line = if self.use_json {
            serde_json::to_string(entry)?
        } else {
            self.format_line(entry)
        };

        match entry.level {
            LogLevel::Warn | LogLevel::Error => eprintln!("{}", line),
            _ => println!("{}", line),
        }
        Ok(())
    }
}
