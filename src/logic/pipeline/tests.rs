//! End-to-end engine tests

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use super::*;
use crate::error::{ConfigError, RiskError, RuleError, StorageError};
use crate::logic::context::{Transaction, TransactionContext};
use crate::logic::metrics::MetricsPeriod;
use crate::logic::policy::{PolicySnapshot, VerticalPolicy};
use crate::logic::rules::builtin::all_rules;
use crate::logic::rules::{Rule, RuleCatalog, RuleCategory, RuleHit, RuleMeta, Severity};
use crate::logic::scoring::{Decision, DecisionResult, Degradation, ModelStatus};
use crate::logic::signals::SignalKind;
use crate::logic::storage::{DecisionStore, MemoryStore};
use crate::logic::velocity::{InMemoryVelocityStore, RetryPolicy, Subject, VelocityStore};
use crate::testing::{FailingSignalProvider, FailingVelocityStore, FixedOracle, SlowOracle};

// ============================================================================
// FIXTURES
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 14, 0, 0).unwrap()
}

/// New account (2 days) asking for 500,000
fn loan_request(id: &str) -> Transaction {
    Transaction::new(id, "u-42", "lending", 500_000.0, t0())
        .with_account_created(t0() - ChronoDuration::days(2))
}

/// Store where u-42 already made 5 transactions in the last hour
async fn busy_velocity() -> Arc<InMemoryVelocityStore> {
    let store = Arc::new(InMemoryVelocityStore::default());
    for i in 0..5i64 {
        let prior = Transaction::new(
            format!("prior-{}", i),
            "u-42",
            "lending",
            100.0,
            t0() - ChronoDuration::minutes(10 * (i + 1)),
        );
        store.observe(&prior.observation()).await.unwrap();
    }
    store
}

fn explodes(_: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    panic!("boom")
}

fn scenario_catalog(extra: Vec<Rule>) -> RuleCatalog {
    let rules: Vec<Rule> = all_rules()
        .into_iter()
        .filter(|r| matches!(r.id(), "NEW_ACCOUNT_LARGE_AMOUNT" | "HIGH_VELOCITY"))
        .chain(extra)
        .collect();
    RuleCatalog::builder().with_rules(rules).unwrap().build().unwrap()
}

fn lending_policies(decline: u32, review: u32) -> PolicySnapshot {
    PolicySnapshot::default().with_policy(VerticalPolicy::new("lending").with_thresholds(decline, review))
}

fn scenario_engine(velocity: Arc<InMemoryVelocityStore>) -> RiskEngineBuilder {
    RiskEngine::builder()
        .with_catalog(scenario_catalog(Vec::new()))
        .with_policies(lending_policies(70, 50))
        .with_velocity_store(velocity)
        .with_deadline(Duration::from_secs(2))
        .with_model_timeout(Duration::from_millis(500))
}

fn untimed(mut result: DecisionResult) -> DecisionResult {
    result.processing_time_us = 0;
    result
}

// ============================================================================
// DOCUMENTED SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_lending_scenario_declines_with_model() {
    let engine = scenario_engine(busy_velocity().await)
        .with_oracle(Arc::new(FixedOracle::new(0.9)))
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();

    assert_eq!(result.rule_ids(), vec!["NEW_ACCOUNT_LARGE_AMOUNT", "HIGH_VELOCITY"]);
    assert_eq!(result.rule_score, 65);
    assert_eq!(result.model_score, Some(90));
    assert_eq!(result.final_score, 75);
    assert_eq!(result.decision, Decision::Decline);
    assert!(!result.degraded);
    assert_eq!(result.flags[0].weighted_score, 35.0);
}

#[tokio::test]
async fn test_lending_scenario_model_timeout_reviews() {
    let engine = scenario_engine(busy_velocity().await)
        .with_oracle(Arc::new(SlowOracle::new(0.9, Duration::from_millis(500))))
        .with_model_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();

    assert_eq!(result.final_score, 65);
    assert_eq!(result.final_score, result.rule_score);
    assert_eq!(result.decision, Decision::Review);
    assert_eq!(result.model_status, ModelStatus::Timeout);
    assert!(result.degraded);
    assert_eq!(result.degradations, vec![Degradation::ModelTimeout]);
}

#[tokio::test]
async fn test_score_equal_to_decline_threshold_declines() {
    let engine = scenario_engine(busy_velocity().await)
        .with_policies(lending_policies(65, 50))
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(result.final_score, 65);
    assert_eq!(result.decision, Decision::Decline);
    assert_eq!(result.model_status, ModelStatus::NotConfigured);
    assert!(!result.degraded);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[tokio::test]
async fn test_transaction_excluded_from_its_own_velocity() {
    let velocity = busy_velocity().await;
    let store = Arc::new(MemoryStore::new());
    let engine = scenario_engine(velocity.clone()).with_store(store.clone()).build().unwrap();

    let user = Subject::user("u-42");
    let before = velocity.aggregates(&user, t0()).await.unwrap().one_hour.count;

    engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    engine.flush().await;

    let after = velocity.aggregates(&user, t0()).await.unwrap().one_hour.count;
    assert_eq!(before, after - 1);

    let record = store.get_decision("loan-1").unwrap().unwrap();
    assert_eq!(record.context.num("user_count_1h"), Ok(Some(before as f64)));
    assert_eq!(record.context.num("user_sum_1h"), Ok(Some(500.0)));
    assert!(record.verify());
}

#[tokio::test]
async fn test_repeated_checks_are_deterministic() {
    let a = scenario_engine(busy_velocity().await)
        .with_oracle(Arc::new(FixedOracle::new(0.37)))
        .build()
        .unwrap();
    let b = scenario_engine(busy_velocity().await)
        .with_oracle(Arc::new(FixedOracle::new(0.37)))
        .build()
        .unwrap();

    let first = a.check_transaction(&loan_request("loan-1")).await.unwrap();
    let second = b.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(untimed(first), untimed(second));
}

#[tokio::test]
async fn test_throwing_rule_changes_nothing_else() {
    let bad = Rule::native(
        RuleMeta::new("ALWAYS_PANICS", "Broken", RuleCategory::Custom, Severity::Critical, 90),
        explodes,
    );
    let healthy = scenario_engine(busy_velocity().await).build().unwrap();
    let broken = scenario_engine(busy_velocity().await)
        .with_catalog(scenario_catalog(vec![bad]))
        .build()
        .unwrap();

    let expected = healthy.check_transaction(&loan_request("loan-1")).await.unwrap();
    let actual = broken.check_transaction(&loan_request("loan-1")).await.unwrap();

    assert_eq!(actual.flags, expected.flags);
    assert_eq!(actual.final_score, expected.final_score);
    assert!(!actual.rule_ids().contains(&"ALWAYS_PANICS"));
    assert_eq!(
        actual.degradations,
        vec![Degradation::RuleFailed { rule_id: "ALWAYS_PANICS".to_string() }]
    );
    // fail-open: recorded, not degraded
    assert!(!actual.degraded);
}

#[tokio::test]
async fn test_disabling_a_rule_never_raises_the_score() {
    let engine = scenario_engine(busy_velocity().await).build().unwrap();
    let with_all = engine.check_transaction(&loan_request("loan-1")).await.unwrap();

    engine.disable_rule("HIGH_VELOCITY").unwrap();
    let without = engine.check_transaction(&loan_request("loan-2")).await.unwrap();
    assert!(without.final_score <= with_all.final_score);
    assert_eq!(without.rule_ids(), vec!["NEW_ACCOUNT_LARGE_AMOUNT"]);
    assert!(without.policy_version > with_all.policy_version);

    engine.enable_rule("HIGH_VELOCITY").unwrap();
    let again = engine.check_transaction(&loan_request("loan-3")).await.unwrap();
    assert!(again.rule_ids().contains(&"HIGH_VELOCITY"));
}

// ============================================================================
// DEGRADATION & FAILURE
// ============================================================================

#[tokio::test]
async fn test_velocity_unavailable_fails_request() {
    let velocity = Arc::new(FailingVelocityStore::default());
    let store = Arc::new(MemoryStore::new());
    let engine = RiskEngine::builder()
        .with_catalog(scenario_catalog(Vec::new()))
        .with_policies(lending_policies(70, 50))
        .with_velocity_store(velocity.clone())
        .with_store(store.clone())
        .with_retry(RetryPolicy::new(1, Duration::from_micros(10)))
        .build()
        .unwrap();

    let err = engine.check_transaction(&loan_request("loan-1")).await.unwrap_err();
    assert!(matches!(err, RiskError::VelocityUnavailable { attempts: 2, .. }));
    assert_eq!(velocity.reads(), 2);

    engine.flush().await;
    assert_eq!(store.decision_count().unwrap(), 0);
}

#[tokio::test]
async fn test_signal_failure_degrades_but_decides() {
    let engine = scenario_engine(busy_velocity().await)
        .with_signal_provider(Arc::new(FailingSignalProvider::new("idv", SignalKind::Identity)))
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(result.final_score, 65);
    assert!(result.degraded);
    assert_eq!(
        result.degradations,
        vec![Degradation::SignalUnavailable { provider: "idv".to_string() }]
    );
}

#[tokio::test]
async fn test_spent_deadline_scores_rule_only() {
    let oracle = Arc::new(FixedOracle::new(0.9));
    let engine = scenario_engine(busy_velocity().await)
        .with_oracle(oracle.clone())
        .with_deadline(Duration::ZERO)
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(result.final_score, 65);
    assert_eq!(result.model_status, ModelStatus::Skipped);
    assert!(result.degraded);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_model_disabled_by_policy_is_not_degraded() {
    let oracle = Arc::new(FixedOracle::new(0.9));
    let engine = scenario_engine(busy_velocity().await)
        .with_oracle(oracle.clone())
        .with_policies(
            PolicySnapshot::default()
                .with_policy(VerticalPolicy::new("lending").with_thresholds(70, 50).without_model()),
        )
        .build()
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(result.model_status, ModelStatus::Disabled);
    assert_eq!(result.final_score, 65);
    assert!(!result.degraded);
    assert_eq!(oracle.calls(), 0);
}

// ============================================================================
// ADMIN
// ============================================================================

#[tokio::test]
async fn test_policy_update_applies_to_next_check() {
    let engine = scenario_engine(busy_velocity().await).build().unwrap();

    let version = engine
        .update_vertical_policy(
            "lending",
            VerticalPolicy::new("lending").with_thresholds(90, 60).with_weight("HIGH_VELOCITY", 0.5),
        )
        .unwrap();

    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert_eq!(result.policy_version, version);
    assert_eq!(result.rule_score, 50);
    assert_eq!(result.decision, Decision::Approve);
}

#[tokio::test]
async fn test_invalid_admin_changes_are_rejected() {
    let engine = scenario_engine(busy_velocity().await).build().unwrap();
    let version = engine.stats().policy_version;

    let inverted = VerticalPolicy::new("lending").with_thresholds(40, 60);
    assert!(matches!(
        engine.update_vertical_policy("lending", inverted),
        Err(ConfigError::InvertedThresholds { .. })
    ));

    let unknown = VerticalPolicy::new("lending").with_weight("NOT_A_RULE", 2.0);
    assert!(matches!(
        engine.update_vertical_policy("lending", unknown),
        Err(ConfigError::UnknownRule(_))
    ));

    assert!(matches!(engine.disable_rule("NOT_A_RULE"), Err(ConfigError::UnknownRule(_))));
    assert_eq!(engine.stats().policy_version, version);
    assert_eq!(engine.get_policy("lending").decline_threshold, 70);
}

#[tokio::test]
async fn test_unknown_vertical_uses_default_policy() {
    let engine = scenario_engine(busy_velocity().await).build().unwrap();
    let mut tx = loan_request("loan-1");
    tx.vertical = "space-tourism".to_string();

    let result = engine.check_transaction(&tx).await.unwrap();
    assert_eq!(result.vertical, "space-tourism");
    assert_eq!(result.decision, Decision::Review);
}

#[tokio::test]
async fn test_rules_file_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(&path, r#"{"rules": []}"#).unwrap();

    let engine = RiskEngine::builder().with_rules_file(path.clone()).build().unwrap();
    let native = engine.catalog().len();

    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"{{"rules": [{{"id": "HUGE_LOAN", "name": "Huge loan", "severity": "high", "base_score": 40,
             "verticals": ["lending"], "message": "Loan of {{amount}}",
             "conditions": [{{"num_at_least": {{"field": "amount", "value": 250000}}}}]}}]}}"#
    )
    .unwrap();
    drop(file);

    assert_eq!(engine.reload_rules_file(&path).unwrap(), native + 1);
    let result = engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    assert!(result.rule_ids().contains(&"HUGE_LOAN"));

    // a broken file keeps the live catalog
    std::fs::write(&path, "{ broken").unwrap();
    assert!(engine.reload_rules_file(&path).is_err());
    assert!(engine.catalog().contains("HUGE_LOAN"));
}

#[tokio::test]
async fn test_policy_file_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{"verticals": [{"vertical": "lending", "decline_threshold": 60, "review_threshold": 40}]}"#)
        .unwrap();

    let engine = RiskEngine::builder().with_policy_file(path.clone()).build().unwrap();
    assert_eq!(engine.get_policy("lending").decline_threshold, 60);

    std::fs::write(&path, r#"{"verticals": [{"vertical": "lending", "decline_threshold": 85, "review_threshold": 55}]}"#)
        .unwrap();
    engine.reload_policy_file(&path).unwrap();
    assert_eq!(engine.get_policy("lending").decline_threshold, 85);

    std::fs::write(&path, r#"{"verticals": [{"vertical": "lending", "decline_threshold": 10, "review_threshold": 55}]}"#)
        .unwrap();
    assert!(engine.reload_policy_file(&path).is_err());
    assert_eq!(engine.get_policy("lending").decline_threshold, 85);
}

#[tokio::test]
async fn test_watched_relative_policy_file_reloads() {
    // relative to the working directory, spelled with a leading `./`
    let dir = tempfile::tempdir_in(".").unwrap();
    let name = dir.path().file_name().unwrap().to_owned();
    let path = std::path::Path::new(".").join(name).join("policy.json");
    std::fs::write(&path, r#"{"verticals": [{"vertical": "lending", "decline_threshold": 60, "review_threshold": 40}]}"#)
        .unwrap();

    let engine = Arc::new(RiskEngine::builder().with_policy_file(path.clone()).build().unwrap());
    let _watcher = engine.watch_config().unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::write(&path, r#"{"verticals": [{"vertical": "lending", "decline_threshold": 85, "review_threshold": 55}]}"#)
        .unwrap();

    let mut decline = 0;
    for _ in 0..50 {
        decline = engine.get_policy("lending").decline_threshold;
        if decline == 85 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(decline, 85);
}

// ============================================================================
// FEEDBACK & METRICS
// ============================================================================

#[tokio::test]
async fn test_outcome_joins_stored_decision() {
    let engine = scenario_engine(busy_velocity().await)
        .with_oracle(Arc::new(FixedOracle::new(0.9)))
        .build()
        .unwrap();
    engine.check_transaction(&loan_request("loan-1")).await.unwrap();

    let outcome = engine.record_outcome("loan-1", true, "first payment default").await.unwrap();
    assert_eq!(outcome.predicted_decision, Decision::Decline);
    assert_eq!(outcome.final_score, 75);

    let missing = engine.record_outcome("loan-404", false, "").await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound(_)));

    let summary = engine.feedback_summary(Some("lending")).await.unwrap();
    assert_eq!(summary.true_positives, 1);
    assert_eq!(summary.rules["HIGH_VELOCITY"].confirmed_fraud, 1);
}

#[tokio::test]
async fn test_vertical_metrics_track_decisions() {
    let engine = scenario_engine(Arc::new(InMemoryVelocityStore::default())).build().unwrap();

    // no prior velocity: only the new-account rule fires → 35, approve
    engine.check_transaction(&loan_request("loan-1")).await.unwrap();
    let small = Transaction::new("loan-2", "u-7", "lending", 50.0, t0());
    engine.check_transaction(&small).await.unwrap();

    let metrics = engine.get_vertical_metrics("lending", MetricsPeriod::OneDay);
    assert_eq!(metrics.volume, 2);
    assert_eq!(metrics.approved, 2);
    assert_eq!(metrics.decline_rate, 0.0);
    assert_eq!(metrics.top_flags[0].rule_id, "NEW_ACCOUNT_LARGE_AMOUNT");

    assert_eq!(engine.get_vertical_metrics("crypto", MetricsPeriod::OneHour).volume, 0);
}
