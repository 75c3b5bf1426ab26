//! Ambient enrichment of log entries

use serde_json::json;

use crate::event::LogEntry;

/// Trait for log enrichment.
///
/// Enrichers only fill in keys the entry does not already carry; call-site
/// and registry context always win.
pub trait Enricher: Send + Sync {
    fn enrich(&self, entry: &mut LogEntry);
}

/// Container for multiple enrichers.
pub struct LogEnricher {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl LogEnricher {
    pub fn new(enrichers: Vec<Box<dyn Enricher>>) -> Self {
        Self { enrichers }
    }

    pub fn enrich(&self, entry: &mut LogEntry) {
        for enricher in &self.enrichers {
            enricher.enrich(entry);
        }
    }
}

impl Default for LogEnricher {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SystemEnricher::new()),
            Box::new(ProcessEnricher::new()),
        ])
    }
}

/// Adds host information: hostname, OS and architecture.
pub struct SystemEnricher {
    hostname: String,
}

impl SystemEnricher {
    pub fn new() -> Self {
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

impl Default for SystemEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for SystemEnricher {
    fn enrich(&self, entry: &mut LogEntry) {
        entry
            .context
            .entry("hostname".to_string())
            .or_insert_with(|| json!(self.hostname));
        entry
            .context
            .entry("os".to_string())
            .or_insert_with(|| json!(std::env::consts::OS));
        entry
            .context
            .entry("arch".to_string())
            .or_insert_with(|| json!(std::env::consts::ARCH));
    }
}

/// Adds process identity, captured once at construction.
pub struct ProcessEnricher {
    process_id: u32,
    process_name: String,
}

impl ProcessEnricher {
    pub fn new() -> Self {
        let process_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            process_id: std::process::id(),
            process_name,
        }
    }
}

impl Default for ProcessEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for ProcessEnricher {
    fn enrich(&self, entry: &mut LogEntry) {
        entry
            .context
            .entry("process_id".to_string())
            .or_insert_with(|| json!(self.process_id));
        entry
            .context
            .entry("process_name".to_string())
            .or_insert_with(|| json!(self.process_name));
    }
}

/// Adds the service name and deployment environment.
pub struct ServiceEnricher {
    service: String,
    environment: String,
}

impl ServiceEnricher {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

impl Enricher for ServiceEnricher {
    fn enrich(&self, entry: &mut LogEntry) {
        entry
            .context
            .entry("service".to_string())
            .or_insert_with(|| json!(self.service));
        entry
            .context
            .entry("environment".to_string())
            .or_insert_with(|| json!(self.environment));
    }
}
