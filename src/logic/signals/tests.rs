use super::*;
use crate::logic::context::{FieldValue, Transaction};
use crate::testing::{FailingSignalProvider, SlowSignalProvider};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

fn values(pairs: &[(&str, FieldValue)]) -> SignalValues {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn tx() -> Transaction {
    Transaction::new("t1", "u1", "crypto", 250.0, Utc::now())
        .with_device("dev-1")
        .with_ip("198.51.100.9")
}

#[tokio::test]
async fn test_fields_are_namespaced_by_kind() {
    let device = StaticSignalProvider::new("devrep", SignalKind::Device).with_entry(
        "dev-1",
        values(&[
            ("risk_score", FieldValue::Num(82.0)),
            ("device_emulator", FieldValue::Bool(true)),
        ]),
    );
    let network = StaticSignalProvider::new("iprep", SignalKind::Network)
        .with_entry("198.51.100.9", values(&[("tor", FieldValue::Bool(true))]));

    let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(network), Arc::new(device)];
    let collected = collect_signals(&providers, &tx(), Duration::from_millis(50)).await;

    let names: Vec<&str> = collected.fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["device_emulator", "device_risk_score", "ip_tor"]);
    assert!(collected.unavailable.is_empty());
}

#[tokio::test]
async fn test_slow_provider_times_out_without_blocking_others() {
    let fast = StaticSignalProvider::new("idv", SignalKind::Identity)
        .with_entry("u1", values(&[("verified", FieldValue::Bool(false))]));
    let slow = SlowSignalProvider::new("slow-devrep", SignalKind::Device, Duration::from_millis(200));

    let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(fast), Arc::new(slow)];
    let started = std::time::Instant::now();
    let collected = collect_signals(&providers, &tx(), Duration::from_millis(20)).await;

    assert!(started.elapsed() < Duration::from_millis(150));
    assert_eq!(collected.unavailable, vec!["slow-devrep".to_string()]);
    assert_eq!(
        collected.fields,
        vec![("identity_verified".to_string(), FieldValue::Bool(false))]
    );
}

#[tokio::test]
async fn test_failing_provider_is_reported() {
    let providers: Vec<Arc<dyn SignalProvider>> =
        vec![Arc::new(FailingSignalProvider::new("consortium", SignalKind::Consortium))];

    let collected = collect_signals(&providers, &tx(), Duration::from_millis(20)).await;
    assert!(collected.fields.is_empty());
    assert_eq!(collected.unavailable, vec!["consortium".to_string()]);
}

#[tokio::test]
async fn test_provider_skipped_without_identifier() {
    let device = StaticSignalProvider::new("devrep", SignalKind::Device);
    let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(device)];

    let bare = Transaction::new("t2", "u2", "gaming", 5.0, Utc::now());
    let collected = collect_signals(&providers, &bare, Duration::from_millis(20)).await;
    assert!(collected.fields.is_empty());
    assert!(collected.unavailable.is_empty());
}

#[test]
fn test_values_from_json_requires_object() {
    assert!(values_from_json(&serde_json::json!([1, 2])).is_err());

    let parsed = values_from_json(&serde_json::json!({"score": 4, "nested": {"x": 1}})).unwrap();
    assert_eq!(parsed.len(), 1);
}
