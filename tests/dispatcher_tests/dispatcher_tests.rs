//! Dispatcher Tests
//!
//! Tests verify:
//! - Routing by `type`
//! - Malformed payloads are echoed, never rejected
//! - Unknown types produce the fixed error response
//! - Invalid fields and limit violations become error responses
//! - Over-deep `compute` inputs are refused before recursing

use std::time::{Duration, Instant};

use flameload::config::WorkloadLimits;
use flameload::workload::DEFAULT_MAX_RECURSION_DEPTH;
use flameload::Config;
use flameload::protocol::Request;
use flameload::Dispatcher;
use serde_json::Value;

// =============================================================================
// Helper Functions
// =============================================================================

fn dispatch_json(dispatcher: &Dispatcher, payload: &[u8]) -> Value {
    let bytes = dispatcher.dispatch(payload);
    serde_json::from_slice(&bytes).unwrap()
}

fn bounded_dispatcher() -> Dispatcher {
    Dispatcher::new(WorkloadLimits {
        max_fib_input: Some(25),
        max_hash_iterations: Some(10_000),
        max_delay_secs: Some(1.0),
    })
}

// =============================================================================
// Routing Tests
// =============================================================================

#[test]
fn test_dispatch_echo() {
    let value = dispatch_json(
        &Dispatcher::default(),
        br#"{"type":"echo","message":"hello"}"#,
    );
    assert_eq!(value["type"], "echo");
    assert_eq!(value["response"], "Echo: hello");
    assert!(value["timestamp"].as_f64().is_some());
}

#[test]
fn test_dispatch_echo_without_message() {
    let value = dispatch_json(&Dispatcher::default(), br#"{"type":"echo"}"#);
    assert_eq!(value["response"], "Echo: ");
}

#[test]
fn test_dispatch_missing_type_is_echo() {
    let value = dispatch_json(&Dispatcher::default(), br#"{"message":"implicit"}"#);
    assert_eq!(value["type"], "echo");
    assert_eq!(value["response"], "Echo: implicit");
}

#[test]
fn test_dispatch_compute() {
    let dispatcher = Dispatcher::default();
    for (n, expected) in [(0, 0), (1, 1), (10, 55), (20, 6765)] {
        let payload = format!(r#"{{"type":"compute","number":{}}}"#, n);
        let value = dispatch_json(&dispatcher, payload.as_bytes());
        assert_eq!(value["type"], "compute");
        assert_eq!(value["input"], n);
        assert_eq!(value["result"], expected);
    }
}

#[test]
fn test_dispatch_hash() {
    let value = dispatch_json(
        &Dispatcher::default(),
        br#"{"type":"hash","data":"default","iterations":1}"#,
    );
    assert_eq!(value["type"], "hash");
    assert_eq!(value["result"], "37a8eec1ce19687d132fe29051dca629");
    assert_eq!(value["iterations"], 1);
}

#[test]
fn test_dispatch_hash_is_reproducible() {
    let dispatcher = Dispatcher::default();
    let payload = br#"{"type":"hash","data":"repeat","iterations":500}"#;
    let first = dispatch_json(&dispatcher, payload);
    let second = dispatch_json(&dispatcher, payload);
    assert_eq!(first["result"], second["result"]);
    assert_eq!(first["result"].as_str().unwrap().len(), 32);
}

#[test]
fn test_dispatch_slow() {
    let start = Instant::now();
    let value = dispatch_json(&Dispatcher::default(), br#"{"type":"slow","delay":0.05}"#);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(value["type"], "slow");
    assert_eq!(value["message"], "Completed slow operation with 0.05s delay");
}

#[test]
fn test_execute_typed_request() {
    let response = Dispatcher::default().execute(Request::compute(10));
    assert_eq!(response.kind().map(|k| k.as_str()), Some("compute"));
}

// =============================================================================
// Tolerance Tests
// =============================================================================

#[test]
fn test_dispatch_plain_text_is_echoed() {
    let value = dispatch_json(&Dispatcher::default(), b"just some text");
    assert_eq!(value["type"], "echo");
    assert_eq!(value["response"], "Echo: just some text");
    assert!(value["timestamp"].as_f64().is_some());
}

#[test]
fn test_dispatch_truncated_json_is_echoed_verbatim() {
    let raw = r#"{"type":"hash","data":"abc","iter"#;
    let value = dispatch_json(&Dispatcher::default(), raw.as_bytes());
    assert_eq!(value["type"], "echo");
    assert_eq!(value["response"], format!("Echo: {}", raw));
}

#[test]
fn test_dispatch_invalid_utf8_is_echoed() {
    let response = Dispatcher::default().handle(&[0xff, 0xfe, b'h', b'i']);
    assert!(!response.is_error());
    assert_eq!(response.kind().map(|k| k.as_str()), Some("echo"));
}

#[test]
fn test_dispatch_unknown_type() {
    let bytes = Dispatcher::default().dispatch(br#"{"type":"reverse","message":"x"}"#);
    assert_eq!(bytes, br#"{"error":"Unknown request type"}"#);
}

#[test]
fn test_dispatch_invalid_field_is_error_response() {
    let value = dispatch_json(&Dispatcher::default(), br#"{"type":"hash","iterations":"many"}"#);
    let error = value["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid request:"), "{}", error);
    assert!(value.get("timestamp").is_none());
}

#[test]
fn test_dispatch_negative_delay_is_error_response() {
    let value = dispatch_json(&Dispatcher::default(), br#"{"type":"slow","delay":-1}"#);
    assert!(value["error"].as_str().unwrap().contains("delay -1"));
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_dispatch_compute_above_limit() {
    let value = dispatch_json(&bounded_dispatcher(), br#"{"type":"compute"}"#);
    assert_eq!(
        value["error"],
        "Fibonacci input 1000 exceeds the configured limit of 25"
    );
}

#[test]
fn test_dispatch_hash_above_limit() {
    let value = dispatch_json(
        &bounded_dispatcher(),
        br#"{"type":"hash","iterations":20000}"#,
    );
    assert!(value["error"].as_str().unwrap().contains("20000"));
}

#[test]
fn test_dispatch_slow_above_limit_does_not_sleep() {
    let start = Instant::now();
    let value = dispatch_json(&bounded_dispatcher(), br#"{"type":"slow","delay":30}"#);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(value["error"].is_string());
}

#[test]
fn test_dispatch_within_limits() {
    let value = dispatch_json(&bounded_dispatcher(), br#"{"type":"compute","number":25}"#);
    assert_eq!(value["result"], 75025);
}

// =============================================================================
// Recursion Depth Tests
// =============================================================================

#[test]
fn test_default_dispatcher_guards_recursion_depth() {
    let dispatcher = Dispatcher::default();
    assert_eq!(dispatcher.max_recursion_depth(), DEFAULT_MAX_RECURSION_DEPTH);
    assert_eq!(dispatcher.limits(), &WorkloadLimits::unbounded());

    let value = dispatch_json(&dispatcher, br#"{"type":"compute","number":10000000}"#);
    assert_eq!(
        value["error"],
        "Fibonacci recursion depth 10000000 exceeds the configured limit of 10000"
    );
}

#[test]
fn test_recursion_guard_applies_before_input_cap() {
    let dispatcher = bounded_dispatcher().with_max_recursion_depth(20);

    let value = dispatch_json(&dispatcher, br#"{"type":"compute","number":22}"#);
    assert!(value["error"].as_str().unwrap().starts_with("Fibonacci recursion depth 22"));

    let value = dispatch_json(&dispatcher, br#"{"type":"compute","number":20}"#);
    assert_eq!(value["result"], 6765);
}

#[test]
fn test_dispatcher_from_config() {
    let config = Config::builder()
        .max_fib_input(12)
        .max_recursion_depth(500)
        .build();
    let dispatcher = Dispatcher::from_config(&config);

    assert_eq!(dispatcher.max_recursion_depth(), 500);
    assert_eq!(dispatcher.limits().max_fib_input, Some(12));
    assert!(dispatcher.execute(Request::compute(13)).is_error());
    assert!(!dispatcher.execute(Request::compute(12)).is_error());
}

#[test]
fn test_negative_compute_passes_depth_guard() {
    let value = dispatch_json(
        &Dispatcher::default().with_max_recursion_depth(1),
        br#"{"type":"compute","number":-7}"#,
    );
    assert_eq!(value["result"], -7);
}
