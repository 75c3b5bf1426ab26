mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::CaptureSink;
use personify_logging::{
    BufferedSink, ContextMap, ContextRegistry, FlushCallback, LogEntry, LogLevel, Logger,
    LoggerBuilder,
};
use serde_json::json;

const LEVELS: [LogLevel; 4] = [
    LogLevel::Debug,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Error,
];

fn quiet_builder() -> LoggerBuilder {
    Logger::builder()
        .enable_console(false)
        .with_registry(Arc::new(ContextRegistry::new()))
}

fn log_at(logger: &Logger, level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => logger.debug(message),
        LogLevel::Info => logger.info(message),
        LogLevel::Warn => logger.warn(message),
        LogLevel::Error => logger.error(message),
    }
}

#[test]
fn test_level_threshold_all_combinations() {
    for min_level in LEVELS {
        for level in LEVELS {
            let sink = CaptureSink::new("capture");
            let logger = quiet_builder()
                .with_min_level(min_level)
                .with_sink(sink.clone())
                .build();

            log_at(&logger, level, "entry");

            let expected = level >= min_level;
            assert_eq!(
                sink.len() == 1,
                expected,
                "level {level} against threshold {min_level}"
            );
        }
    }
}

#[test]
fn test_sink_level_filter_applies_after_logger_threshold() {
    for sink_min in LEVELS {
        for level in LEVELS {
            let sink = CaptureSink::with_min_level("capture", sink_min);
            let logger = quiet_builder()
                .with_min_level(LogLevel::Debug)
                .with_sink(sink.clone())
                .build();

            log_at(&logger, level, "entry");

            assert_eq!(
                sink.len() == 1,
                level >= sink_min,
                "level {level} against sink threshold {sink_min}"
            );
        }
    }
}

#[test]
fn test_context_precedence() {
    let registry = Arc::new(ContextRegistry::new());
    registry.set("b", 2);

    let sink = CaptureSink::new("capture");
    let logger = Logger::builder()
        .enable_console(false)
        .with_registry(registry)
        .with_field("a", 1)
        .with_sink(sink.clone())
        .build();

    logger.info_with(
        "merged",
        ContextMap::from([("a".to_string(), json!(3)), ("c".to_string(), json!(4))]),
    );

    let entry = &sink.entries()[0];
    let expected: HashMap<String, serde_json::Value> = HashMap::from([
        ("a".to_string(), json!(3)),
        ("b".to_string(), json!(2)),
        ("c".to_string(), json!(4)),
    ]);
    assert_eq!(entry.context, expected);
    // The session id is carried as a dedicated field, not duplicated in context.
    assert!(entry.session_id.is_some());
}

#[test]
fn test_correlation_ids_copied_onto_entries() {
    let registry = Arc::new(ContextRegistry::new());
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder()
        .with_registry(Arc::clone(&registry))
        .with_sink(sink.clone())
        .build();

    let request_id = registry.new_request_id();
    registry.set("user_id", "u-42");
    logger.info("correlated");
    registry.clear_request_id();
    logger.info("uncorrelated");

    let entries = sink.entries();
    assert_eq!(entries[0].request_id.as_deref(), Some(request_id.as_str()));
    assert_eq!(entries[0].user_id.as_deref(), Some("u-42"));
    assert_eq!(entries[0].session_id.as_deref(), Some(registry.session_id()));
    assert!(entries[1].request_id.is_none());
}

#[test]
fn test_failing_sink_does_not_block_remaining_sinks() {
    let broken = CaptureSink::failing("broken");
    let working = CaptureSink::new("working");
    let logger = quiet_builder()
        .with_sink(broken)
        .with_sink(working.clone())
        .build();

    logger.info("still delivered");

    assert_eq!(working.messages(), vec!["still delivered"]);
}

#[test]
fn test_remove_sink_matches_all_by_name() {
    let first = CaptureSink::new("capture");
    let second = CaptureSink::new("capture");
    let keeper = CaptureSink::new("keeper");
    let logger = quiet_builder()
        .with_sink(first)
        .with_sink(second)
        .with_sink(keeper.clone())
        .build();

    logger.remove_sink("capture");
    logger.info("after removal");

    assert_eq!(logger.sink_names(), vec!["keeper"]);
    assert_eq!(keeper.len(), 1);
}

#[test]
fn test_child_context_is_isolated_from_parent() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder()
        .with_field("origin", "parent")
        .with_sink(sink.clone())
        .build();

    let child = logger.child(ContextMap::from([
        ("origin".to_string(), json!("child")),
        ("page".to_string(), json!("chat")),
    ]));

    child.info("from child");
    logger.info("from parent");

    let entries = sink.entries();
    assert_eq!(entries[0].context["origin"], json!("child"));
    assert_eq!(entries[0].context["page"], json!("chat"));
    assert_eq!(entries[1].context["origin"], json!("parent"));
    assert!(!entries[1].context.contains_key("page"));
}

#[test]
fn test_child_shares_the_sink_list() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder().with_sink(sink).build();
    let child = logger.child(ContextMap::new());

    let added = CaptureSink::new("added");
    child.add_sink(added);

    assert_eq!(logger.sink_names(), vec!["capture", "added"]);
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("twin backend unreachable")]
struct BackendError;

#[test]
fn test_track_success_logs_start_and_completion_metrics() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder().with_sink(sink.clone()).build();

    let result: Result<u32, BackendError> = logger.track("profile_build", None, || Ok(7));
    assert_eq!(result.unwrap(), 7);

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "Starting profile_build");
    assert_eq!(entries[1].message, "Completed profile_build");
    assert_eq!(entries[1].level, LogLevel::Debug);
    assert!(entries[1].performance.is_some());
    assert_eq!(entries[1].context["operation"], json!("profile_build"));
}

#[test]
fn test_track_failure_rethrows_unchanged() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder().with_sink(sink.clone()).build();

    let result: Result<u32, BackendError> =
        logger.track("profile_build", None, || Err(BackendError));
    assert_eq!(result.unwrap_err(), BackendError);

    let errors: Vec<LogEntry> = sink
        .entries()
        .into_iter()
        .filter(|e| e.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Failed profile_build");
    assert!(errors[0].performance.is_some());
    let error = errors[0].error.as_ref().unwrap();
    assert_eq!(error.name, "BackendError");
    assert_eq!(error.message, "twin backend unreachable");
}

#[tokio::test]
async fn test_track_async_failure_rethrows_unchanged() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder().with_sink(sink.clone()).build();

    let result: Result<u32, BackendError> = logger
        .track_async("send_message", None, || async { Err(BackendError) })
        .await;
    assert_eq!(result.unwrap_err(), BackendError);

    let errors: Vec<LogEntry> = sink
        .entries()
        .into_iter()
        .filter(|e| e.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Failed send_message");
}

#[tokio::test]
async fn test_track_async_success_matches_sync_shape() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder().with_sink(sink.clone()).build();

    let result: Result<&str, BackendError> = logger
        .track_async("send_message", None, || async { Ok("reply") })
        .await;
    assert_eq!(result.unwrap(), "reply");

    assert_eq!(
        sink.messages(),
        vec!["Starting send_message", "Completed send_message"]
    );
}

#[test]
fn test_perf_is_noop_unless_enabled() {
    let sink = CaptureSink::new("capture");
    let logger = quiet_builder()
        .enable_performance(false)
        .with_sink(sink.clone())
        .build();

    let mut tracker = personify_logging::PerformanceTracker::new();
    tracker.start();
    logger.perf("render pass", tracker.end());
    assert_eq!(sink.len(), 0);

    let sink = CaptureSink::new("capture");
    let logger = quiet_builder()
        .enable_performance(true)
        .with_sink(sink.clone())
        .build();
    logger.perf("render pass", tracker.end());
    assert_eq!(sink.len(), 1);
    assert!(sink.entries()[0].performance.is_some());
}

#[test]
fn test_end_to_end_console_and_buffered() {
    let batches: Arc<std::sync::Mutex<Vec<Vec<LogEntry>>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let captured = Arc::clone(&batches);
    let callback: FlushCallback = Arc::new(move |batch| {
        captured.lock().unwrap().push(batch);
        Ok(())
    });

    let console = CaptureSink::new("console");
    let buffered = Arc::new(BufferedSink::new(callback).with_max_buffer_size(2));
    let logger = quiet_builder()
        .with_min_level(LogLevel::Info)
        .with_sink(console.clone())
        .with_sink(buffered)
        .build();

    logger.debug("x");
    logger.info("a");
    logger.warn("b");

    let flushed = batches.lock().unwrap();
    assert_eq!(flushed.len(), 1);
    let messages: Vec<_> = flushed[0].iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b"]);
    assert_eq!(console.messages(), vec!["a", "b"]);
}
