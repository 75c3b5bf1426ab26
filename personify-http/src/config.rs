//! HTTP client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,

    /// Calls slower than this are flagged at warn level
    #[serde(with = "humantime_serde")]
    pub slow_call_threshold: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Personify/0.2".to_string(),
            verify_ssl: true,
            slow_call_threshold: Duration::from_millis(2000),
        }
    }
}
