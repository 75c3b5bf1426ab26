//! Logger bootstrap helpers

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use super::{init_logger, LoggingConfig};
use crate::context::ContextMap;
use crate::error_info::ErrorDetails;

/// Initialize logging from configuration.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    // With no sinks configured, fall back to plain tracing output.
    if config.sinks.is_empty() {
        return init_simple_tracing(&config.level.to_string());
    }

    let logger = config
        .build_logger()
        .map_err(|e| anyhow::anyhow!("Failed to build logger: {}", e))?;

    init_logger(logger).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Initialize simple tracing for basic console output.
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init avoids a panic if a global subscriber is already set.
    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

static PANIC_CAPTURE: OnceCell<()> = OnceCell::new();

/// Route uncaught panics through the default logger's error path.
///
/// Must be called explicitly, once, by the host application; repeated calls
/// do not stack hooks. The previous panic hook still runs afterwards.
pub fn install_panic_capture() {
    PANIC_CAPTURE.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(logger) = crate::logger() {
                let message = panic_message(info);
                let mut context = ContextMap::new();
                if let Some(location) = info.location() {
                    context.insert(
                        "location".to_string(),
                        format!("{}:{}", location.file(), location.line()).into(),
                    );
                }
                logger.error_with(
                    "Uncaught panic",
                    Some(ErrorDetails::new("Panic", message)),
                    context,
                );
                logger.flush_all();
            }
            previous(info);
        }));
    });
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
