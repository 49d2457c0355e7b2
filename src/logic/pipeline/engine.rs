//! Risk Engine
//!
//! One `check_transaction` call:
//! context (velocity + signals) → rules → model → ensemble → observe → record.
//! Everything is read from one catalog and one policy snapshot taken at the
//! start of the call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::constants;
use crate::error::{ConfigError, RiskError, StorageError, StorageResult};
use crate::logic::context::{FeatureContextBuilder, Transaction, TransactionContext};
use crate::logic::feedback::{FeedbackSink, FeedbackSummary};
use crate::logic::metrics::{MetricsPeriod, MetricsRegistry, VerticalMetrics};
use crate::logic::model::{score_with_timeout, FeatureVector, ModelOracle};
use crate::logic::policy::watcher::{absolute, same_file};
use crate::logic::policy::{ConfigWatcher, PolicyFile, PolicySnapshot, PolicyStore, VerticalPolicy};
use crate::logic::rules::{self, CatalogStore, RuleCatalog, RuleFile};
use crate::logic::scoring::{aggregate, DecisionResult, Degradation, ModelOutcome};
use crate::logic::signals::SignalProvider;
use crate::logic::storage::{
    DecisionRecord, DecisionRecorder, DecisionStore, MemoryStore, OutcomeRecord, RecorderStats,
};
use crate::logic::velocity::{InMemoryVelocityStore, RetryPolicy, VelocityStore};

// ============================================================================
// BUILDER
// ============================================================================

pub struct RiskEngineBuilder {
    catalog: Option<RuleCatalog>,
    policies: Option<PolicySnapshot>,
    velocity: Option<Arc<dyn VelocityStore>>,
    providers: Vec<Arc<dyn SignalProvider>>,
    oracle: Option<Arc<dyn ModelOracle>>,
    store: Option<Arc<dyn DecisionStore>>,
    deadline: Duration,
    model_timeout: Duration,
    signal_timeout: Duration,
    retry: RetryPolicy,
    recorder_queue: usize,
    policy_file: Option<PathBuf>,
    rules_file: Option<PathBuf>,
}

impl Default for RiskEngineBuilder {
    fn default() -> Self {
        Self {
            catalog: None,
            policies: None,
            velocity: None,
            providers: Vec::new(),
            oracle: None,
            store: None,
            deadline: Duration::from_millis(constants::DEFAULT_DEADLINE_MS),
            model_timeout: Duration::from_millis(constants::DEFAULT_MODEL_TIMEOUT_MS),
            signal_timeout: Duration::from_millis(constants::DEFAULT_SIGNAL_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            recorder_queue: constants::DEFAULT_RECORDER_QUEUE,
            policy_file: None,
            rules_file: None,
        }
    }
}

impl RiskEngineBuilder {
    /// Replace the built-in native catalog
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the built-in vertical presets
    pub fn with_policies(mut self, snapshot: PolicySnapshot) -> Self {
        self.policies = Some(snapshot);
        self
    }

    pub fn with_velocity_store(mut self, store: Arc<dyn VelocityStore>) -> Self {
        self.velocity = Some(store);
        self
    }

    pub fn with_signal_provider(mut self, provider: Arc<dyn SignalProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn ModelOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_signal_timeout(mut self, timeout: Duration) -> Self {
        self.signal_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_recorder_queue(mut self, capacity: usize) -> Self {
        self.recorder_queue = capacity;
        self
    }

    /// Declarative rules loaded at build and on every reload
    pub fn with_rules_file(mut self, path: PathBuf) -> Self {
        self.rules_file = Some(path);
        self
    }

    /// Policy file loaded at build and on every reload
    pub fn with_policy_file(mut self, path: PathBuf) -> Self {
        self.policy_file = Some(path);
        self
    }

    /// Validate configuration and start the decision recorder.
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<RiskEngine, ConfigError> {
        let catalog = match (&self.rules_file, self.catalog) {
            (Some(path), _) => RuleCatalog::with_definitions(&RuleFile::load(path)?.rules)?,
            (None, Some(catalog)) => catalog,
            (None, None) => RuleCatalog::builtin()?,
        };

        let snapshot = match (&self.policy_file, self.policies) {
            (Some(path), _) => PolicyFile::load(path)?.into_snapshot()?,
            (None, Some(snapshot)) => snapshot,
            (None, None) => crate::logic::policy::builtin_snapshot(),
        };
        snapshot.validate()?;
        check_references(&snapshot, &catalog)?;

        let velocity = self
            .velocity
            .unwrap_or_else(|| Arc::new(InMemoryVelocityStore::default()));
        let mut context_builder = FeatureContextBuilder::new(velocity.clone())
            .with_retry(self.retry)
            .with_signal_timeout(self.signal_timeout);
        for provider in self.providers {
            context_builder = context_builder.with_provider(provider);
        }

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let recorder = DecisionRecorder::spawn(store.clone(), self.recorder_queue);

        tracing::info!(
            rules = catalog.len(),
            verticals = snapshot.policies.len() + 1,
            model = self.oracle.as_ref().map(|o| o.name()).unwrap_or("none"),
            deadline_ms = self.deadline.as_millis() as u64,
            "Risk engine ready"
        );

        Ok(RiskEngine {
            catalog: CatalogStore::new(catalog),
            policies: PolicyStore::new(snapshot),
            velocity,
            context_builder,
            oracle: self.oracle,
            deadline: self.deadline,
            model_timeout: self.model_timeout,
            recorder,
            feedback: Arc::new(FeedbackSink::new(store)),
            metrics: MetricsRegistry::new(),
            admin: Mutex::new(()),
            policy_file: self.policy_file,
            rules_file: self.rules_file,
        })
    }
}

fn check_references(snapshot: &PolicySnapshot, catalog: &RuleCatalog) -> Result<(), ConfigError> {
    for id in snapshot.referenced_rules() {
        if !catalog.contains(id) {
            return Err(ConfigError::UnknownRule(id.to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub rules: usize,
    pub policy_version: u64,
    pub recorder: RecorderStats,
}

pub struct RiskEngine {
    catalog: CatalogStore,
    policies: PolicyStore,
    velocity: Arc<dyn VelocityStore>,
    context_builder: FeatureContextBuilder,
    oracle: Option<Arc<dyn ModelOracle>>,
    deadline: Duration,
    model_timeout: Duration,
    recorder: DecisionRecorder,
    feedback: Arc<FeedbackSink>,
    metrics: MetricsRegistry,
    /// Serializes admin updates and reloads against each other
    admin: Mutex<()>,
    policy_file: Option<PathBuf>,
    rules_file: Option<PathBuf>,
}

impl RiskEngine {
    pub fn builder() -> RiskEngineBuilder {
        RiskEngineBuilder::default()
    }

    // ------------------------------------------------------------------------
    // CheckTransaction
    // ------------------------------------------------------------------------

    /// Score one transaction. Fails only when velocity cannot be read; every
    /// other problem yields a degraded but complete decision.
    pub async fn check_transaction(&self, tx: &Transaction) -> Result<DecisionResult, RiskError> {
        let started = std::time::Instant::now();
        let deadline = Instant::now() + self.deadline;

        let catalog = self.catalog.load();
        let snapshot = self.policies.snapshot();
        let policy = snapshot.policy(&tx.vertical);

        let built = match self.context_builder.build(tx, deadline).await {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(
                    transaction_id = %tx.transaction_id,
                    vertical = %tx.vertical,
                    error = %e,
                    "Transaction rejected"
                );
                return Err(e);
            }
        };
        let mut degradations = built.degradations;

        let evaluation = rules::evaluate(&catalog, &built.context, &tx.vertical, &snapshot);
        degradations.extend(evaluation.failures.iter().map(|f| Degradation::RuleFailed {
            rule_id: f.rule_id.clone(),
        }));

        let model = self.score_model(&built.context, policy, deadline, &tx.transaction_id).await;
        degradations.extend(model.degradation());

        let breakdown = aggregate(evaluation.flags, policy, &model);
        let result = DecisionResult::new(
            &tx.transaction_id,
            &tx.vertical,
            breakdown,
            degradations,
            snapshot.version,
        )
        .with_processing_time(started.elapsed().as_micros() as u64);

        // score-then-observe: this transaction never counts toward its own velocity
        if let Err(e) = self.velocity.observe(&tx.observation()).await {
            tracing::error!(transaction_id = %tx.transaction_id, error = %e, "Velocity observe failed");
        }

        self.metrics.record(&result, Utc::now());
        self.recorder.record(DecisionRecord::new(result.clone(), built.context));

        tracing::debug!(
            transaction_id = %result.transaction_id,
            vertical = %result.vertical,
            decision = %result.decision,
            final_score = result.final_score,
            rule_score = result.rule_score,
            model_score = ?result.model_score,
            flags = result.flags.len(),
            degraded = result.degraded,
            elapsed_us = result.processing_time_us,
            "Transaction scored"
        );
        Ok(result)
    }

    async fn score_model(
        &self,
        ctx: &TransactionContext,
        policy: &VerticalPolicy,
        deadline: Instant,
        transaction_id: &str,
    ) -> ModelOutcome {
        let Some(oracle) = &self.oracle else {
            return ModelOutcome::NotConfigured;
        };
        if !policy.model_enabled {
            return ModelOutcome::Disabled;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = self.model_timeout.min(remaining);
        let features = FeatureVector::from_context(ctx);
        score_with_timeout(oracle.as_ref(), &features, budget, transaction_id).await
    }

    // ------------------------------------------------------------------------
    // Read-only
    // ------------------------------------------------------------------------

    pub fn get_vertical_metrics(&self, vertical: &str, period: MetricsPeriod) -> VerticalMetrics {
        self.metrics.snapshot(vertical, period, Utc::now())
    }

    pub fn get_policy(&self, vertical: &str) -> VerticalPolicy {
        self.policies.get_policy(vertical)
    }

    pub fn policy_snapshot(&self) -> Arc<PolicySnapshot> {
        self.policies.snapshot()
    }

    pub fn catalog(&self) -> Arc<RuleCatalog> {
        self.catalog.load()
    }

    /// Name of the configured scoring oracle, if any
    pub fn model_name(&self) -> Option<&str> {
        self.oracle.as_ref().map(|o| o.name())
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            rules: self.catalog.load().len(),
            policy_version: self.policies.version(),
            recorder: self.recorder.stats(),
        }
    }

    // ------------------------------------------------------------------------
    // Administrative
    // ------------------------------------------------------------------------

    pub fn update_vertical_policy(&self, vertical: &str, policy: VerticalPolicy) -> Result<u64, ConfigError> {
        let _guard = self.admin.lock();
        let catalog = self.catalog.load();
        self.policies
            .update_policy(vertical, policy, &catalog)
            .inspect_err(|e| tracing::error!(vertical, error = %e, "Policy update rejected"))
    }

    pub fn enable_rule(&self, rule_id: &str) -> Result<u64, ConfigError> {
        self.toggle_rule(rule_id, true)
    }

    pub fn disable_rule(&self, rule_id: &str) -> Result<u64, ConfigError> {
        self.toggle_rule(rule_id, false)
    }

    fn toggle_rule(&self, rule_id: &str, enabled: bool) -> Result<u64, ConfigError> {
        let _guard = self.admin.lock();
        let catalog = self.catalog.load();
        self.policies
            .set_rule_enabled(rule_id, enabled, &catalog)
            .inspect_err(|e| tracing::error!(rule_id, enabled, error = %e, "Rule toggle rejected"))
    }

    /// Replace the policy snapshot from a file. On failure the live
    /// snapshot is untouched.
    pub fn reload_policy_file(&self, path: &Path) -> Result<u64, ConfigError> {
        let _guard = self.admin.lock();
        let catalog = self.catalog.load();
        PolicyFile::load(path)
            .and_then(PolicyFile::into_snapshot)
            .and_then(|snapshot| self.policies.replace(snapshot, &catalog))
            .inspect(|version| tracing::info!(path = %path.display(), version, "Policy file reloaded"))
            .inspect_err(|e| tracing::error!(path = %path.display(), error = %e, "Policy reload rejected"))
    }

    /// Rebuild the catalog (native + file rules) and swap it in. Rejected if
    /// the live policy references a rule the new catalog lacks.
    pub fn reload_rules_file(&self, path: &Path) -> Result<usize, ConfigError> {
        let _guard = self.admin.lock();
        let result = RuleFile::load(path)
            .and_then(|file| RuleCatalog::with_definitions(&file.rules))
            .and_then(|catalog| {
                check_references(&self.policies.snapshot(), &catalog)?;
                Ok(catalog)
            });

        match result {
            Ok(catalog) => {
                let count = catalog.len();
                self.catalog.swap(catalog);
                tracing::info!(path = %path.display(), rules = count, "Rules file reloaded");
                Ok(count)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Rules reload rejected");
                Err(e)
            }
        }
    }

    /// Hot-reload the configured policy/rules files. None when neither is set.
    pub fn watch_config(self: &Arc<Self>) -> Result<Option<ConfigWatcher>, ConfigError> {
        let files: Vec<PathBuf> = self
            .policy_file
            .iter()
            .chain(self.rules_file.iter())
            .cloned()
            .collect();
        if files.is_empty() {
            return Ok(None);
        }

        // resolved once, the same way the watcher resolves its targets
        let policy_file = self.policy_file.as_deref().map(absolute);
        let rules_file = self.rules_file.as_deref().map(absolute);

        let engine: Weak<Self> = Arc::downgrade(self);
        let watcher = ConfigWatcher::watch(files, move |path| {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            engine.reload_changed(path, policy_file.as_deref(), rules_file.as_deref());
        })?;
        Ok(Some(watcher))
    }

    fn reload_changed(&self, path: &Path, policy_file: Option<&Path>, rules_file: Option<&Path>) {
        let is = |configured: Option<&Path>| configured.map_or(false, |p| same_file(p, path));
        // errors are already logged by the reload functions
        if is(rules_file) {
            let _ = self.reload_rules_file(path);
        }
        if is(policy_file) {
            let _ = self.reload_policy_file(path);
        }
    }

    // ------------------------------------------------------------------------
    // Feedback
    // ------------------------------------------------------------------------

    /// `RecordOutcome(transactionId, actualFraud, notes)`
    pub async fn record_outcome(
        &self,
        transaction_id: &str,
        actual_fraud: bool,
        notes: &str,
    ) -> StorageResult<OutcomeRecord> {
        // the decision may still be queued
        self.recorder.flush().await;

        let sink = self.feedback.clone();
        let transaction_id = transaction_id.to_string();
        let notes = notes.to_string();
        tokio::task::spawn_blocking(move || sink.record_outcome(&transaction_id, actual_fraud, &notes))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    pub async fn feedback_summary(&self, vertical: Option<&str>) -> StorageResult<FeedbackSummary> {
        let sink = self.feedback.clone();
        let vertical = vertical.map(str::to_string);
        tokio::task::spawn_blocking(move || sink.summary(vertical.as_deref()))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Wait for queued decision records to reach the store
    pub async fn flush(&self) {
        self.recorder.flush().await;
    }
}
