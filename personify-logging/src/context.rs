//! Ambient correlation context shared across log call sites

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Key/value context merged into log entries.
pub type ContextMap = HashMap<String, JsonValue>;

pub const REQUEST_ID_KEY: &str = "request_id";
pub const SESSION_ID_KEY: &str = "session_id";
pub const USER_ID_KEY: &str = "user_id";

static GLOBAL_REGISTRY: OnceCell<Arc<ContextRegistry>> = OnceCell::new();

/// Shared registry of ambient context and correlation identifiers.
///
/// The session id is generated once per registry and never changes. At most
/// one request id is active per registry at a time: overlapping operations
/// that share a registry will alias request ids. Scope request ids tightly
/// (set at dispatch, cleared at completion) or use [`ContextRegistry::request_scope`],
/// which restores the previous id when the guard drops.
pub struct ContextRegistry {
    session_id: String,
    request_id: RwLock<Option<String>>,
    context: RwLock<ContextMap>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            request_id: RwLock::new(None),
            context: RwLock::new(ContextMap::new()),
        }
    }

    /// Process-wide registry, created lazily on first access.
    pub fn global() -> Arc<ContextRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(ContextRegistry::new()))
            .clone()
    }

    /// Merge one value into the ambient context; last write wins per key.
    /// Values that fail to serialize are skipped.
    pub fn set(&self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.write_context().insert(key.into(), json_value);
        }
    }

    /// Merge several values into the ambient context.
    pub fn set_many(&self, entries: ContextMap) {
        self.write_context().extend(entries);
    }

    /// Snapshot copy of the ambient context, never the live mapping.
    pub fn snapshot(&self) -> ContextMap {
        self.read_context().clone()
    }

    pub fn remove(&self, key: &str) {
        self.write_context().remove(key);
    }

    pub fn clear(&self) {
        self.write_context().clear();
    }

    /// Generate a fresh correlation id, store it as the active request id and
    /// return it.
    pub fn new_request_id(&self) -> String {
        let id = Uuid::new_v4().to_string();
        *self.write_request_id() = Some(id.clone());
        id
    }

    pub fn current_request_id(&self) -> Option<String> {
        self.read_request_id().clone()
    }

    pub fn clear_request_id(&self) {
        *self.write_request_id() = None;
    }

    /// Stable identifier for this registry's lifetime.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Union of the ambient context plus the session id and, when active, the
    /// request id. This is what the logger merges into every entry.
    pub fn all_context(&self) -> ContextMap {
        let mut merged = self.snapshot();
        merged.insert(SESSION_ID_KEY.to_string(), JsonValue::String(self.session_id.clone()));
        if let Some(request_id) = self.current_request_id() {
            merged.insert(REQUEST_ID_KEY.to_string(), JsonValue::String(request_id));
        }
        merged
    }

    /// Activate a fresh request id for the duration of one operation. The
    /// previously active id (if any) is restored when the guard drops.
    pub fn request_scope(&self) -> RequestScope<'_> {
        let previous = self.current_request_id();
        let id = self.new_request_id();
        RequestScope {
            registry: self,
            previous,
            id,
        }
    }

    fn read_context(&self) -> RwLockReadGuard<'_, ContextMap> {
        self.context.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_context(&self) -> RwLockWriteGuard<'_, ContextMap> {
        self.context.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_request_id(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.request_id.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_request_id(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.request_id.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`ContextRegistry::request_scope`].
pub struct RequestScope<'a> {
    registry: &'a ContextRegistry,
    previous: Option<String>,
    id: String,
}

impl RequestScope<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        *self.registry.write_request_id() = self.previous.take();
    }
}
