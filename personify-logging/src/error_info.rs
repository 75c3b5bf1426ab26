//! Normalized error descriptors attached to log entries

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A normalized description of a failure, derived from any error-like value.
///
/// Normalization is total: every input yields a valid descriptor. Typed errors
/// keep their type name, message and source chain; arbitrary JSON values are
/// stringified into the message with the name fixed to `"Error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetails {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            cause: None,
            code: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Normalize a typed error, keeping its type name, message and source.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let mut details = Self::new(short_type_name(std::any::type_name::<E>()), error.to_string());
        if let Some(source) = error.source() {
            details.cause = Some(source.to_string());
        }
        details
    }

    /// Normalize an arbitrary JSON value.
    ///
    /// Strings become the message as-is; objects and arrays are serialized
    /// into the message; anything else is coerced via string conversion.
    pub fn from_value(value: &JsonValue) -> Self {
        let message = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Object(_) | JsonValue::Array(_) => {
                serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
            }
            other => other.to_string(),
        };
        Self::new("Error", message)
    }

    /// Normalize any displayable value.
    pub fn from_display(value: impl std::fmt::Display) -> Self {
        Self::new("Error", value.to_string())
    }
}

impl From<anyhow::Error> for ErrorDetails {
    fn from(error: anyhow::Error) -> Self {
        let mut details = Self::new("Error", error.to_string());
        if let Some(source) = error.chain().nth(1) {
            details.cause = Some(source.to_string());
        }
        // The alternate Debug rendering carries the full chain and, when
        // captured, the backtrace.
        details.stack = Some(format!("{:?}", error));
        details
    }
}

/// Last path segment of a fully qualified type name.
fn short_type_name(full: &str) -> String {
    full.rsplit("::").next().unwrap_or(full).to_string()
}
