use std::sync::{Arc, Mutex};

use personify_http::{ApiClient, HttpClient, HttpError, HttpMethod, RequestPayload};
use personify_logging::{
    ContextRegistry, LogEntry, LogLevel, Logger, Sink, SinkError,
};
use serde_json::json;

struct CaptureSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl CaptureSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
        })
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        "capture"
    }

    fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

fn instrumented_client() -> (ApiClient, Arc<CaptureSink>, Arc<ContextRegistry>) {
    let sink = CaptureSink::new();
    let registry = Arc::new(ContextRegistry::new());
    let logger = Logger::builder()
        .enable_console(false)
        .with_min_level(LogLevel::Debug)
        .with_registry(Arc::clone(&registry))
        .with_sink(sink.clone())
        .build();
    let client = ApiClient::new(Arc::new(logger)).unwrap();
    (client, sink, registry)
}

#[tokio::test]
async fn test_setup_failure_is_logged_and_clears_request_id() {
    let (client, sink, registry) = instrumented_client();

    let result = client.get("personality/profile").await;
    assert!(matches!(result, Err(HttpError::Setup(_))));
    assert!(registry.current_request_id().is_none());

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);

    // Request phase entry carries the correlation id.
    assert_eq!(entries[0].level, LogLevel::Debug);
    assert!(entries[0].request_id.is_some());

    let failure = &entries[1];
    assert_eq!(failure.level, LogLevel::Error);
    let details = failure.error.as_ref().unwrap();
    assert_eq!(details.code.as_deref(), Some("setup"));
    assert!(failure.context.contains_key("duration_ms"));
    assert_eq!(failure.request_id, entries[0].request_id);
}

#[tokio::test]
async fn test_network_failure_is_logged_and_rethrown() {
    let (client, sink, registry) = instrumented_client();

    // Nothing listens on the discard port.
    let result = client.get("http://127.0.0.1:9/api/chat").await;
    assert!(matches!(result, Err(HttpError::Network(_))));
    assert!(registry.current_request_id().is_none());

    let entries = sink.entries();
    let failure = entries.last().unwrap();
    assert_eq!(failure.level, LogLevel::Error);
    assert_eq!(failure.context["method"], json!("GET"));
    assert_eq!(failure.context["url"], json!("http://127.0.0.1:9/api/chat"));
    assert!(failure.error.as_ref().unwrap().code.is_some());
}

#[tokio::test]
async fn test_multipart_payload_logs_flag_not_content() {
    let (client, sink, _registry) = instrumented_client();

    let form = reqwest::multipart::Form::new().text("document", "my diary, verbatim");
    let _ = client.upload("http://127.0.0.1:9/api/upload", form).await;

    let request = &sink.entries()[0];
    assert_eq!(request.context["has_binary_payload"], json!(true));
    let serialized = serde_json::to_string(request).unwrap();
    assert!(!serialized.contains("my diary"));
}

#[tokio::test]
async fn test_json_payload_is_not_flagged_binary() {
    let (client, sink, _registry) = instrumented_client();

    let _ = client
        .post_json("http://127.0.0.1:9/api/chat", json!({"message": "hi"}))
        .await;

    let request = &sink.entries()[0];
    assert_eq!(request.context["has_binary_payload"], json!(false));
}

#[tokio::test]
async fn test_execute_accepts_explicit_method_and_payload() {
    let (client, sink, _registry) = instrumented_client();

    let _ = client
        .execute(
            HttpMethod::Delete,
            "http://127.0.0.1:9/api/documents/1",
            None,
        )
        .await;

    let request = &sink.entries()[0];
    assert_eq!(request.context["method"], json!("DELETE"));
    assert!(!request.context.contains_key("has_binary_payload"));
}

#[test]
fn test_request_payload_flag() {
    assert!(!RequestPayload::Json(json!({})).has_binary_payload());
    let form = reqwest::multipart::Form::new();
    assert!(RequestPayload::Multipart(form).has_binary_payload());
}
