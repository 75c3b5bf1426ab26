//! Component lifecycle instrumentation
//!
//! Guard-based hooks tying a logger to one UI component's lifecycle: mount
//! and unmount duration, render cadence, user interactions, wrapped async
//! operations, and effect setup/cleanup timing. Guards are plain values, so
//! running a hook on every lifecycle iteration accumulates no listeners.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;

use crate::context::ContextMap;
use crate::error_info::ErrorDetails;
use crate::logger::Logger;
use crate::perf::round2;

/// A logger bound to one named component.
pub struct ComponentLogger {
    logger: Arc<Logger>,
    component: String,
}

impl ComponentLogger {
    pub fn new(logger: Arc<Logger>, component: impl Into<String>) -> Self {
        Self {
            logger,
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    fn base_context(&self) -> ContextMap {
        ContextMap::from([(
            "component".to_string(),
            JsonValue::String(self.component.clone()),
        )])
    }

    /// Ad hoc info emitter scoped to this component.
    pub fn info(&self, message: impl Into<String>) {
        self.logger.info_with(message, self.base_context());
    }

    /// Log the mount and return a guard that logs the unmount, including the
    /// elapsed mounted duration, when dropped.
    pub fn mount(&self) -> MountGuard {
        self.logger
            .debug_with(format!("{} mounted", self.component), self.base_context());
        MountGuard {
            logger: Arc::clone(&self.logger),
            component: self.component.clone(),
            mounted_at: Instant::now(),
        }
    }

    /// Tracker for render cadence diagnostics.
    pub fn render_tracker(&self) -> RenderTracker {
        RenderTracker {
            logger: Arc::clone(&self.logger),
            component: self.component.clone(),
            renders: 0,
            last_render: None,
        }
    }

    /// Log a user interaction with an action label and optional details.
    pub fn interaction(&self, action: &str, details: Option<JsonValue>) {
        let mut context = self.base_context();
        context.insert("action".to_string(), JsonValue::String(action.to_string()));
        if let Some(details) = details {
            context.insert("details".to_string(), details);
        }
        self.logger
            .info_with(format!("{} interaction: {}", self.component, action), context);
    }

    /// Wrap an async operation, auto-prefixing its name with the component.
    pub async fn track_async<T, E, F, Fut>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let name = format!("{}.{}", self.component, operation);
        self.logger
            .track_async(&name, Some(self.base_context()), f)
            .await
    }

    /// Run an effect, logging its setup duration. The returned guard logs the
    /// cleanup duration, if the effect produced a cleanup, when dropped.
    pub fn effect(
        &self,
        name: &str,
        setup: impl FnOnce() -> Option<Box<dyn FnOnce() + Send>>,
    ) -> EffectGuard {
        let started = Instant::now();
        let cleanup = setup();
        let setup_ms = round2(started.elapsed().as_secs_f64() * 1000.0);

        let mut context = self.base_context();
        context.insert("effect".to_string(), JsonValue::String(name.to_string()));
        context.insert("setup_ms".to_string(), JsonValue::from(setup_ms));
        self.logger
            .debug_with(format!("{} effect {} ran", self.component, name), context);

        EffectGuard {
            logger: Arc::clone(&self.logger),
            component: self.component.clone(),
            effect: name.to_string(),
            cleanup,
        }
    }

    /// Log a failure tagged with this component.
    pub fn error<E: std::error::Error + ?Sized>(&self, error: &E, context: Option<ContextMap>) {
        let mut merged = self.base_context();
        if let Some(context) = context {
            merged.extend(context);
        }
        self.logger.error_with(
            format!("{} error", self.component),
            Some(ErrorDetails::from_error(error)),
            merged,
        );
    }
}

/// Logs the unmount, with elapsed mounted duration, on drop.
pub struct MountGuard {
    logger: Arc<Logger>,
    component: String,
    mounted_at: Instant,
}

impl MountGuard {
    pub fn mounted_ms(&self) -> f64 {
        round2(self.mounted_at.elapsed().as_secs_f64() * 1000.0)
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        let mut context = ContextMap::from([(
            "component".to_string(),
            JsonValue::String(self.component.clone()),
        )]);
        context.insert("mounted_ms".to_string(), JsonValue::from(self.mounted_ms()));
        self.logger
            .debug_with(format!("{} unmounted", self.component), context);
    }
}

/// Counts renders and logs the interval since the previous one. Does not
/// filter or throttle.
pub struct RenderTracker {
    logger: Arc<Logger>,
    component: String,
    renders: u64,
    last_render: Option<Instant>,
}

impl RenderTracker {
    pub fn on_render(&mut self) {
        self.renders += 1;
        let since_last_ms = self
            .last_render
            .map(|last| round2(last.elapsed().as_secs_f64() * 1000.0));
        self.last_render = Some(Instant::now());

        let mut context = ContextMap::from([(
            "component".to_string(),
            JsonValue::String(self.component.clone()),
        )]);
        context.insert("render".to_string(), JsonValue::from(self.renders));
        if let Some(since_last_ms) = since_last_ms {
            context.insert("since_last_ms".to_string(), JsonValue::from(since_last_ms));
        }
        self.logger
            .debug_with(format!("{} rendered", self.component), context);
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }
}

/// Runs and times the effect's cleanup on drop.
pub struct EffectGuard {
    logger: Arc<Logger>,
    component: String,
    effect: String,
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        let Some(cleanup) = self.cleanup.take() else {
            return;
        };
        let started = Instant::now();
        cleanup();
        let cleanup_ms = round2(started.elapsed().as_secs_f64() * 1000.0);

        let mut context = ContextMap::from([(
            "component".to_string(),
            JsonValue::String(self.component.clone()),
        )]);
        context.insert("effect".to_string(), JsonValue::String(self.effect.clone()));
        context.insert("cleanup_ms".to_string(), JsonValue::from(cleanup_ms));
        self.logger.debug_with(
            format!("{} effect {} cleaned up", self.component, self.effect),
            context,
        );
    }
}
