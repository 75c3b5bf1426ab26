//! Instrumented HTTP client for the Personify backend API
//!
//! This crate wraps `reqwest` with request/response/error instrumentation
//! feeding the structured logger from `personify-logging`: correlation ids
//! per call, durations, response sizes and slow-call flagging.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, ApiResponse, HttpClient, RequestPayload};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use types::{HttpMethod, HttpMethodError};
