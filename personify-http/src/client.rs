//! Instrumented HTTP client
//!
//! Every call runs through three instrumented phases feeding the structured
//! logger: a request entry (with a fresh correlation id), a response entry
//! carrying duration and size (slow calls additionally flagged), and an error
//! entry for the failure cases in [`crate::errors::HttpError`]. The active
//! correlation id is cleared once the outcome has been logged.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};

use personify_logging::{
    ContextMap, ContextRegistry, ErrorDetails, Logger, PerformanceMetrics, PerformanceTracker,
};

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::HttpMethod;

/// Longest response-body excerpt attached to error entries.
const MAX_LOGGED_BODY: usize = 2048;

/// Request body for an API call.
pub enum RequestPayload {
    Json(JsonValue),
    /// Multipart form data, e.g. document uploads. Only a boolean presence
    /// flag is ever logged for these, never the content.
    Multipart(Form),
}

impl RequestPayload {
    pub fn has_binary_payload(&self) -> bool {
        matches!(self, RequestPayload::Multipart(_))
    }
}

/// Parsed response with delivery metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
    pub response_bytes: usize,
}

/// HTTP client trait for making instrumented API calls
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Option<RequestPayload>,
    ) -> Result<ApiResponse, HttpError>;
}

/// HTTP client for the Personify backend, wired to a structured logger and
/// its correlation registry.
pub struct ApiClient {
    client: Client,
    config: HttpConfig,
    logger: Arc<Logger>,
    registry: Arc<ContextRegistry>,
}

impl ApiClient {
    pub fn new(logger: Arc<Logger>) -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default(), logger)
    }

    pub fn with_config(config: HttpConfig, logger: Arc<Logger>) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| HttpError::Setup(e.to_string()))?;

        let registry = Arc::clone(logger.registry());
        Ok(Self {
            client,
            config,
            logger,
            registry,
        })
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse, HttpError> {
        self.execute(HttpMethod::Get, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: JsonValue) -> Result<ApiResponse, HttpError> {
        self.execute(HttpMethod::Post, url, Some(RequestPayload::Json(body)))
            .await
    }

    /// Upload multipart form data, e.g. a personal document.
    pub async fn upload(&self, url: &str, form: Form) -> Result<ApiResponse, HttpError> {
        self.execute(HttpMethod::Post, url, Some(RequestPayload::Multipart(form)))
            .await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, HttpError> {
        self.execute(HttpMethod::Delete, url, None).await
    }

    fn call_context(&self, method: HttpMethod, url: &str) -> ContextMap {
        ContextMap::from([
            ("method".to_string(), json!(method.as_str())),
            ("url".to_string(), json!(url)),
        ])
    }

    fn finish_error(
        &self,
        message: String,
        details: ErrorDetails,
        mut context: ContextMap,
        metrics: &PerformanceMetrics,
    ) {
        context.insert("duration_ms".to_string(), json!(metrics.duration_ms));
        self.logger.error_with(message, Some(details), context);
        self.registry.clear_request_id();
    }
}

#[async_trait]
impl HttpClient for ApiClient {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Option<RequestPayload>,
    ) -> Result<ApiResponse, HttpError> {
        let mut tracker = PerformanceTracker::new();
        tracker.start();
        self.registry.new_request_id();

        let mut request_context = self.call_context(method, url);
        if let Some(payload) = &payload {
            request_context.insert(
                "has_binary_payload".to_string(),
                json!(payload.has_binary_payload()),
            );
        }
        self.logger
            .debug_with(format!("API request {} {}", method, url), request_context);

        // Construction failure: bad URL, nothing was sent.
        let parsed = match url::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(error) => {
                self.finish_error(
                    format!("API request setup failed {} {}", method, url),
                    ErrorDetails::from_error(&error).with_code("setup"),
                    self.call_context(method, url),
                    &tracker.end(),
                );
                return Err(HttpError::Setup(error.to_string()));
            }
        };

        let mut request = self.client.request(method.into(), parsed);
        match payload {
            Some(RequestPayload::Json(body)) => request = request.json(&body),
            Some(RequestPayload::Multipart(form)) => request = request.multipart(form),
            None => {}
        }

        let outcome = request.send().await;
        let metrics = tracker.end();

        let response = match outcome {
            Ok(response) => response,
            // Dispatched, but no usable response came back.
            Err(error) => {
                self.finish_error(
                    format!("API request failed {} {}", method, url),
                    ErrorDetails::from_error(&error).with_code(HttpError::network_kind(&error)),
                    self.call_context(method, url),
                    &metrics,
                );
                return Err(HttpError::Network(error));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut context = self.call_context(method, url);
            context.insert("status".to_string(), json!(status.as_u16()));
            self.finish_error(
                format!("API error response {} {}", method, url),
                ErrorDetails::new("HttpStatus", excerpt(&body)).with_code(status.as_u16().to_string()),
                context,
                &metrics,
            );
            return Err(HttpError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(error) => {
                self.finish_error(
                    format!("API response unreadable {} {}", method, url),
                    ErrorDetails::from_error(&error).with_code(HttpError::network_kind(&error)),
                    self.call_context(method, url),
                    &metrics,
                );
                return Err(HttpError::Network(error));
            }
        };

        let response_bytes = text.len();
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!(text));

        let mut context = self.call_context(method, url);
        context.insert("status".to_string(), json!(status.as_u16()));
        context.insert("duration_ms".to_string(), json!(metrics.duration_ms));
        context.insert("response_bytes".to_string(), json!(response_bytes));
        self.logger
            .info_with(format!("API response {} {}", method, url), context);

        let threshold_ms = self.config.slow_call_threshold.as_secs_f64() * 1000.0;
        if metrics.duration_ms > threshold_ms {
            let mut context = self.call_context(method, url);
            context.insert("duration_ms".to_string(), json!(metrics.duration_ms));
            context.insert("threshold_ms".to_string(), json!(threshold_ms));
            self.logger
                .warn_with(format!("Slow API call {} {}", method, url), context);
        }

        self.registry.clear_request_id();
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
            response_bytes,
        })
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let mut cut = MAX_LOGGED_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}
