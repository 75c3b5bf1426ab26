//! Core logger: level filtering, context merging, sink fan-out

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;

use crate::context::{ContextMap, ContextRegistry, REQUEST_ID_KEY, SESSION_ID_KEY, USER_ID_KEY};
use crate::enrichment::LogEnricher;
use crate::error_info::ErrorDetails;
use crate::event::{LogEntry, LogLevel};
use crate::perf::{PerformanceMetrics, PerformanceTracker};
use crate::sinks::{ConsoleSink, Sink};

/// Sink list shared between a logger and its children.
type SinkList = Arc<RwLock<Vec<Arc<dyn Sink>>>>;

/// Builds one entry per call and fans it out to every registered sink.
///
/// Context precedence, lowest to highest: the logger's static context, the
/// registry's ambient context, then call-site context. A failing sink is
/// reported and skipped; it never blocks the remaining sinks or the caller.
pub struct Logger {
    min_level: LogLevel,
    global_context: ContextMap,
    sinks: SinkList,
    registry: Arc<ContextRegistry>,
    enricher: Option<Arc<LogEnricher>>,
    performance_enabled: bool,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.dispatch(LogLevel::Debug, message.into(), None, None, None);
    }

    pub fn debug_with(&self, message: impl Into<String>, context: ContextMap) {
        self.dispatch(LogLevel::Debug, message.into(), Some(context), None, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.dispatch(LogLevel::Info, message.into(), None, None, None);
    }

    pub fn info_with(&self, message: impl Into<String>, context: ContextMap) {
        self.dispatch(LogLevel::Info, message.into(), Some(context), None, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.dispatch(LogLevel::Warn, message.into(), None, None, None);
    }

    pub fn warn_with(&self, message: impl Into<String>, context: ContextMap) {
        self.dispatch(LogLevel::Warn, message.into(), Some(context), None, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.dispatch(LogLevel::Error, message.into(), None, None, None);
    }

    /// Log an error entry with a normalized descriptor and extra context.
    pub fn error_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorDetails>,
        context: ContextMap,
    ) {
        self.dispatch(LogLevel::Error, message.into(), Some(context), error, None);
    }

    /// Shorthand normalizing a typed error.
    pub fn error_cause<E: std::error::Error + ?Sized>(&self, message: impl Into<String>, error: &E) {
        self.dispatch(
            LogLevel::Error,
            message.into(),
            None,
            Some(ErrorDetails::from_error(error)),
            None,
        );
    }

    /// Generic entry point used by the logging macros.
    pub fn log_at(&self, level: LogLevel, message: impl Into<String>, context: Option<ContextMap>) {
        self.dispatch(level, message.into(), context, None, None);
    }

    /// Debug-level entry carrying explicit metrics. A no-op unless
    /// performance logging is enabled.
    pub fn perf(&self, message: impl Into<String>, metrics: PerformanceMetrics) {
        self.perf_with(message, metrics, ContextMap::new());
    }

    pub fn perf_with(
        &self,
        message: impl Into<String>,
        metrics: PerformanceMetrics,
        context: ContextMap,
    ) {
        if !self.performance_enabled {
            return;
        }
        self.dispatch(
            LogLevel::Debug,
            message.into(),
            Some(context),
            None,
            Some(metrics),
        );
    }

    /// Run `operation`, logging start, completion metrics and failures. The
    /// outcome is returned unchanged, so failures keep their identity.
    pub fn track<T, E, F>(&self, operation: &str, context: Option<ContextMap>, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error,
    {
        let (tracker, op_context) = self.track_begin(operation, context);
        let outcome = f();
        self.track_finish(operation, op_context, tracker, outcome.as_ref().err());
        outcome
    }

    /// Async variant of [`Logger::track`] with the same logging shape.
    pub async fn track_async<T, E, F, Fut>(
        &self,
        operation: &str,
        context: Option<ContextMap>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let (tracker, op_context) = self.track_begin(operation, context);
        let outcome = f().await;
        self.track_finish(operation, op_context, tracker, outcome.as_ref().err());
        outcome
    }

    fn track_begin(
        &self,
        operation: &str,
        context: Option<ContextMap>,
    ) -> (PerformanceTracker, ContextMap) {
        let mut op_context = context.unwrap_or_default();
        op_context.insert("operation".to_string(), JsonValue::String(operation.to_string()));

        let mut tracker = PerformanceTracker::new();
        tracker.start();
        self.dispatch(
            LogLevel::Debug,
            format!("Starting {}", operation),
            Some(op_context.clone()),
            None,
            None,
        );
        (tracker, op_context)
    }

    fn track_finish<E: std::error::Error>(
        &self,
        operation: &str,
        op_context: ContextMap,
        tracker: PerformanceTracker,
        error: Option<&E>,
    ) {
        let metrics = tracker.end();
        match error {
            None => self.dispatch(
                LogLevel::Debug,
                format!("Completed {}", operation),
                Some(op_context),
                None,
                Some(metrics),
            ),
            Some(error) => self.dispatch(
                LogLevel::Error,
                format!("Failed {}", operation),
                Some(op_context),
                Some(ErrorDetails::from_error(error)),
                Some(metrics),
            ),
        }
    }

    /// New logger sharing this one's configuration and sink list, with
    /// `context` merged on top. Context changes on either side stay local.
    pub fn child(&self, context: ContextMap) -> Logger {
        let mut merged = self.global_context.clone();
        merged.extend(context);
        Logger {
            min_level: self.min_level,
            global_context: merged,
            sinks: Arc::clone(&self.sinks),
            registry: Arc::clone(&self.registry),
            enricher: self.enricher.clone(),
            performance_enabled: self.performance_enabled,
        }
    }

    /// Append a sink to the shared list.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.write_sinks().push(sink);
    }

    /// Remove every sink with the given name from the shared list.
    pub fn remove_sink(&self, name: &str) {
        self.write_sinks().retain(|sink| sink.name() != name);
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.read_sinks().iter().map(|s| s.name().to_string()).collect()
    }

    /// Ask every sink to deliver whatever it has buffered.
    pub fn flush_all(&self) {
        for sink in self.read_sinks().iter() {
            if let Err(error) = sink.flush() {
                tracing::warn!(sink = sink.name(), "log sink flush failed: {error}");
            }
        }
    }

    fn dispatch(
        &self,
        level: LogLevel,
        message: String,
        call_context: Option<ContextMap>,
        error: Option<ErrorDetails>,
        performance: Option<PerformanceMetrics>,
    ) {
        if level < self.min_level {
            return;
        }

        let mut context = self.global_context.clone();
        context.extend(self.registry.all_context());
        if let Some(call_context) = call_context {
            context.extend(call_context);
        }

        let mut entry = LogEntry::new(level, message);
        entry.request_id = take_string(&mut context, REQUEST_ID_KEY);
        entry.session_id = take_string(&mut context, SESSION_ID_KEY);
        entry.user_id = take_string(&mut context, USER_ID_KEY);
        entry.context = context;
        entry.error = error;
        entry.performance = performance;

        if let Some(enricher) = &self.enricher {
            enricher.enrich(&mut entry);
        }

        for sink in self.read_sinks().iter() {
            if !sink.should_log(level) {
                continue;
            }
            if let Err(error) = sink.log(&entry) {
                tracing::warn!(sink = sink.name(), "log sink failed: {error}");
            }
        }
    }

    fn read_sinks(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn Sink>>> {
        self.sinks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sinks(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn Sink>>> {
        self.sinks.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Move a string value out of the merged context into a dedicated entry
/// field, so correlation ids are not serialized twice.
fn take_string(context: &mut ContextMap, key: &str) -> Option<String> {
    match context.remove(key) {
        Some(JsonValue::String(s)) => Some(s),
        Some(other) => {
            context.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Builder in the crate's usual style.
pub struct LoggerBuilder {
    min_level: LogLevel,
    context: ContextMap,
    sinks: Vec<Arc<dyn Sink>>,
    registry: Option<Arc<ContextRegistry>>,
    enricher: Option<Arc<LogEnricher>>,
    enable_console: bool,
    performance_enabled: bool,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::default_for_build(),
            context: ContextMap::new(),
            sinks: Vec::new(),
            registry: None,
            enricher: None,
            enable_console: true,
            performance_enabled: cfg!(debug_assertions),
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl serde::Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.context.insert(key.into(), json_value);
        }
        self
    }

    pub fn with_context(mut self, context: ContextMap) -> Self {
        self.context.extend(context);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_registry(mut self, registry: Arc<ContextRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_enricher(mut self, enricher: LogEnricher) -> Self {
        self.enricher = Some(Arc::new(enricher));
        self
    }

    /// Whether a console sink is prepended automatically. Defaults to true.
    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    /// Whether `perf` entries are emitted. Defaults to on in debug builds.
    pub fn enable_performance(mut self, enable: bool) -> Self {
        self.performance_enabled = enable;
        self
    }

    pub fn build(self) -> Logger {
        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
        if self.enable_console {
            sinks.push(Arc::new(ConsoleSink::new()));
        }
        sinks.extend(self.sinks);

        Logger {
            min_level: self.min_level,
            global_context: self.context,
            sinks: Arc::new(RwLock::new(sinks)),
            registry: self.registry.unwrap_or_else(ContextRegistry::global),
            enricher: self.enricher,
            performance_enabled: self.performance_enabled,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
