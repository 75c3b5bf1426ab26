//! Logger configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrichment::{LogEnricher, ProcessEnricher, ServiceEnricher, SystemEnricher};
use crate::event::LogLevel;
use crate::logger::{Logger, LoggerBuilder};
use crate::sinks::buffer::{DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_SIZE};
use crate::sinks::store::DEFAULT_MAX_ENTRIES;
use crate::sinks::{BufferedSink, ConsoleSink, FlushCallback, Sink, StoreSink};

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading a configuration file
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Validation error
    #[error("Invalid logging configuration: {0}")]
    ValidationError(String),
}

/// Logging configuration, usually deserialized from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logger-wide threshold
    pub level: LogLevel,

    /// Configured sinks, in dispatch order
    pub sinks: Vec<SinkConfig>,

    /// Ambient enrichment switches
    pub enrichment: EnrichmentConfig,

    /// Whether `perf` entries are emitted
    pub enable_performance: bool,

    /// Reserved for error-tracking sinks; no sink consumes it yet
    pub enable_error_tracking: bool,
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Console {
        #[serde(default)]
        level: Option<LogLevel>,
        #[serde(default)]
        use_json: bool,
    },
    Buffered {
        #[serde(default = "default_max_buffer_size")]
        max_buffer_size: usize,
        #[serde(default = "default_flush_interval", with = "humantime_serde")]
        flush_interval: Duration,
    },
    Store {
        path: PathBuf,
        #[serde(default = "default_max_entries")]
        max_entries: usize,
    },
}

/// Enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub system_info: bool,
    pub process_info: bool,
    /// Service name stamped on every entry
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            sinks: vec![SinkConfig::Console {
                level: None,
                use_json: false,
            }],
            enrichment: EnrichmentConfig::default(),
            enable_performance: false,
            enable_error_tracking: true,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            system_info: true,
            process_info: true,
            service_name: "personify".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for sink in &self.sinks {
            match sink {
                SinkConfig::Console { .. } => {}
                SinkConfig::Buffered {
                    max_buffer_size, ..
                } => {
                    if *max_buffer_size == 0 {
                        return Err(ConfigError::ValidationError(
                            "buffered sink max_buffer_size must be greater than 0".to_string(),
                        ));
                    }
                }
                SinkConfig::Store { path, max_entries } => {
                    if path.as_os_str().is_empty() {
                        return Err(ConfigError::ValidationError(
                            "store sink path must not be empty".to_string(),
                        ));
                    }
                    if *max_entries == 0 {
                        return Err(ConfigError::ValidationError(
                            "store sink max_entries must be greater than 0".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Build a logger from this configuration. Fails when a buffered sink is
    /// configured, since batch delivery needs a host-supplied callback; use
    /// [`LoggingConfig::build_logger_with_flush`] in that case.
    pub fn build_logger(&self) -> ConfigResult<Arc<Logger>> {
        self.build_logger_with_flush(None)
    }

    /// Build a logger, wiring `flush` into any configured buffered sink.
    pub fn build_logger_with_flush(
        &self,
        flush: Option<FlushCallback>,
    ) -> ConfigResult<Arc<Logger>> {
        self.validate()?;

        // Sinks come entirely from the config; the builder's console
        // auto-prepend would duplicate a configured console sink.
        let mut builder = LoggerBuilder::new()
            .with_min_level(self.level)
            .enable_console(false)
            .enable_performance(self.enable_performance)
            .with_enricher(self.build_enricher());

        for sink in &self.sinks {
            builder = builder.with_sink(self.build_sink(sink, flush.as_ref())?);
        }

        Ok(Arc::new(builder.build()))
    }

    fn build_sink(
        &self,
        sink: &SinkConfig,
        flush: Option<&FlushCallback>,
    ) -> ConfigResult<Arc<dyn Sink>> {
        match sink {
            SinkConfig::Console { level, use_json } => {
                let console = ConsoleSink::new()
                    .with_min_level(level.unwrap_or(self.level))
                    .with_json(*use_json);
                Ok(Arc::new(console))
            }
            SinkConfig::Buffered {
                max_buffer_size,
                flush_interval,
            } => {
                let callback = flush.ok_or_else(|| {
                    ConfigError::ValidationError(
                        "buffered sink requires a flush callback; use build_logger_with_flush"
                            .to_string(),
                    )
                })?;
                let buffered = Arc::new(
                    BufferedSink::new(Arc::clone(callback))
                        .with_max_buffer_size(*max_buffer_size),
                );
                buffered.spawn_interval_flush(*flush_interval);
                Ok(buffered)
            }
            SinkConfig::Store { path, max_entries } => {
                Ok(Arc::new(StoreSink::new(path).with_max_entries(*max_entries)))
            }
        }
    }

    fn build_enricher(&self) -> LogEnricher {
        let mut enrichers: Vec<Box<dyn crate::enrichment::Enricher>> = Vec::new();
        enrichers.push(Box::new(ServiceEnricher::new(
            self.enrichment.service_name.clone(),
        )));
        if self.enrichment.system_info {
            enrichers.push(Box::new(SystemEnricher::new()));
        }
        if self.enrichment.process_info {
            enrichers.push(Box::new(ProcessEnricher::new()));
        }
        LogEnricher::new(enrichers)
    }
}

fn default_max_buffer_size() -> usize {
    DEFAULT_MAX_BUFFER_SIZE
}

fn default_flush_interval() -> Duration {
    DEFAULT_FLUSH_INTERVAL
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}
