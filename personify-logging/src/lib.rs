//! Structured logging core for Personify
//!
//! This crate provides the observability layer of the Personify client:
//! - Typed log entries with level filtering and context merging
//! - Correlation context (session id, per-request id, ambient key/values)
//! - Pluggable sinks: console, buffered batch delivery, capped persistent store
//! - Performance tracking with sync/async operation wrappers
//! - Component lifecycle instrumentation hooks

pub mod component;
pub mod config;
pub mod context;
pub mod enrichment;
pub mod error_info;
pub mod event;
pub mod init;
pub mod logger;
pub mod perf;
pub mod sinks;

// Re-export main types for convenience
pub use component::{ComponentLogger, EffectGuard, MountGuard, RenderTracker};
pub use config::{ConfigError, ConfigResult, EnrichmentConfig, LoggingConfig, SinkConfig};
pub use context::{ContextMap, ContextRegistry, RequestScope};
pub use enrichment::{Enricher, LogEnricher, ProcessEnricher, ServiceEnricher, SystemEnricher};
pub use error_info::ErrorDetails;
pub use event::{LogEntry, LogLevel};
pub use init::{init_logging_from_config, init_simple_tracing, install_panic_capture};
pub use logger::{Logger, LoggerBuilder};
pub use perf::{PerfError, PerformanceMetrics, PerformanceTracker};
pub use sinks::{BufferedSink, ConsoleSink, FlushCallback, Sink, SinkError, StoreSink};

use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_LOGGER: OnceCell<Arc<Logger>> = OnceCell::new();

/// Initialize the process-wide default logger
pub fn init_logger(logger: Arc<Logger>) -> Result<(), &'static str> {
    GLOBAL_LOGGER.set(logger).map_err(|_| "Logger already initialized")
}

/// Get the process-wide default logger
pub fn logger() -> Option<Arc<Logger>> {
    GLOBAL_LOGGER.get().cloned()
}

/// Log a structured entry through the default logger
#[macro_export]
macro_rules! log_event {
    ($level:expr, $message:expr) => {
        if let Some(logger) = $crate::logger() {
            logger.log_at($level, $message, None);
        }
    };
    ($level:expr, $message:expr, $($key:expr => $value:expr),*) => {
        if let Some(logger) = $crate::logger() {
            let mut context = $crate::ContextMap::new();
            $(
                if let Ok(value) = ::serde_json::to_value($value) {
                    context.insert($key.to_string(), value);
                }
            )*
            logger.log_at($level, $message, Some(context));
        }
    };
}
