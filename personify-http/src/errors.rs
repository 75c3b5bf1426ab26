//! HTTP error types
//!
//! The variants map one-to-one onto the three instrumented failure cases:
//! the server answered with an error status, the request went out but no
//! usable response came back, or the request could not be constructed.

use thiserror::Error;

/// Error type for API calls
#[derive(Debug, Error)]
pub enum HttpError {
    /// Server responded with an error status
    #[error("HTTP {status} from {method} {url}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Request was dispatched but no usable response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request could not be constructed
    #[error("Invalid request: {0}")]
    Setup(String),
}

impl HttpError {
    /// Short machine-readable code for a transport-level failure.
    pub fn network_kind(error: &reqwest::Error) -> &'static str {
        if error.is_timeout() {
            "timeout"
        } else if error.is_connect() {
            "connect"
        } else if error.is_body() {
            "body"
        } else if error.is_decode() {
            "decode"
        } else if error.is_request() {
            "request"
        } else {
            "network"
        }
    }
}
