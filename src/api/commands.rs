//! Commands - Exposed operations
//!
//! Thin facades over [`RiskEngine`]: typed request DTOs in, typed results or a
//! serializable [`CommandError`] out. `dispatch` routes an `op`-tagged request.

use serde::{Deserialize, Serialize};

use crate::api::engine_status::EngineStatus;
use crate::error::{ConfigError, RiskError, StorageError};
use crate::logic::context::Transaction;
use crate::logic::feedback::FeedbackSummary;
use crate::logic::metrics::{MetricsPeriod, VerticalMetrics};
use crate::logic::pipeline::RiskEngine;
use crate::logic::policy::VerticalPolicy;
use crate::logic::scoring::DecisionResult;
use crate::logic::storage::OutcomeRecord;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub transaction_id: String,
    pub actual_fraud: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
    pub vertical: String,
    pub policy: VerticalPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleToggle {
    pub rule_id: String,
}

fn default_period() -> MetricsPeriod {
    MetricsPeriod::OneDay
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRequest {
    pub vertical: String,
    #[serde(default = "default_period")]
    pub period: MetricsPeriod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub vertical: Option<String>,
}

/// Kết quả của admin update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdated {
    pub vertical: String,
    pub policy_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleToggled {
    pub rule_id: String,
    pub enabled: bool,
    pub policy_version: u64,
}

/// One harness request, tagged by `op`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Check(Transaction),
    Outcome(OutcomeRequest),
    UpdatePolicy(UpdatePolicyRequest),
    EnableRule(RuleToggle),
    DisableRule(RuleToggle),
    Metrics(MetricsRequest),
    FeedbackSummary(FeedbackRequest),
    Status,
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::Check(_) => "check",
            Request::Outcome(_) => "outcome",
            Request::UpdatePolicy(_) => "update_policy",
            Request::EnableRule(_) => "enable_rule",
            Request::DisableRule(_) => "disable_rule",
            Request::Metrics(_) => "metrics",
            Request::FeedbackSummary(_) => "feedback_summary",
            Request::Status => "status",
        }
    }
}

/// Error surfaced to API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
}

impl CommandError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<RiskError> for CommandError {
    fn from(e: RiskError) -> Self {
        match e {
            RiskError::VelocityUnavailable { .. } => Self::new("velocity_unavailable", e.to_string()),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        let code = match &e {
            ConfigError::UnknownRule(_) => "unknown_rule",
            ConfigError::InvertedThresholds { .. } | ConfigError::InvalidPolicy { .. } => "invalid_policy",
            _ => "invalid_config",
        };
        Self::new(code, e.to_string())
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        let code = match &e {
            StorageError::NotFound(_) => "not_found",
            _ => "storage",
        };
        Self::new(code, e.to_string())
    }
}

/// One harness response line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub op: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl Response {
    fn from_result<T: Serialize>(op: &str, result: Result<T, CommandError>) -> Self {
        let result = result.and_then(|value| {
            serde_json::to_value(value).map_err(|e| CommandError::new("serialization", e.to_string()))
        });
        match result {
            Ok(data) => Self {
                op: op.to_string(),
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self::failure(op, error),
        }
    }

    pub fn failure(op: &str, error: CommandError) -> Self {
        Self {
            op: op.to_string(),
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// SCORING COMMANDS
// ============================================================================

/// CheckTransaction
pub async fn check_transaction(engine: &RiskEngine, tx: &Transaction) -> Result<DecisionResult, CommandError> {
    Ok(engine.check_transaction(tx).await?)
}

// ============================================================================
// READ-ONLY COMMANDS
// ============================================================================

/// GetVerticalMetrics
pub fn get_vertical_metrics(engine: &RiskEngine, req: &MetricsRequest) -> VerticalMetrics {
    engine.get_vertical_metrics(&req.vertical, req.period)
}

pub async fn get_feedback_summary(engine: &RiskEngine, req: &FeedbackRequest) -> Result<FeedbackSummary, CommandError> {
    Ok(engine.feedback_summary(req.vertical.as_deref()).await?)
}

pub fn get_engine_status(engine: &RiskEngine) -> EngineStatus {
    EngineStatus::collect(engine)
}

// ============================================================================
// ADMIN COMMANDS
// ============================================================================

/// UpdateVerticalPolicy
pub fn update_vertical_policy(engine: &RiskEngine, req: UpdatePolicyRequest) -> Result<PolicyUpdated, CommandError> {
    let policy_version = engine.update_vertical_policy(&req.vertical, req.policy)?;
    Ok(PolicyUpdated {
        vertical: req.vertical,
        policy_version,
    })
}

/// EnableRule / DisableRule
pub fn set_rule_enabled(engine: &RiskEngine, req: &RuleToggle, enabled: bool) -> Result<RuleToggled, CommandError> {
    let policy_version = if enabled {
        engine.enable_rule(&req.rule_id)?
    } else {
        engine.disable_rule(&req.rule_id)?
    };
    Ok(RuleToggled {
        rule_id: req.rule_id.clone(),
        enabled,
        policy_version,
    })
}

// ============================================================================
// FEEDBACK COMMANDS
// ============================================================================

/// RecordOutcome
pub async fn record_outcome(engine: &RiskEngine, req: &OutcomeRequest) -> Result<OutcomeRecord, CommandError> {
    Ok(engine
        .record_outcome(&req.transaction_id, req.actual_fraud, &req.notes)
        .await?)
}

// ============================================================================
// DISPATCH
// ============================================================================

pub async fn dispatch(engine: &RiskEngine, request: Request) -> Response {
    let op = request.op();
    match request {
        Request::Check(tx) => Response::from_result(op, check_transaction(engine, &tx).await),
        Request::Outcome(req) => Response::from_result(op, record_outcome(engine, &req).await),
        Request::UpdatePolicy(req) => Response::from_result(op, update_vertical_policy(engine, req)),
        Request::EnableRule(req) => Response::from_result(op, set_rule_enabled(engine, &req, true)),
        Request::DisableRule(req) => Response::from_result(op, set_rule_enabled(engine, &req, false)),
        Request::Metrics(req) => Response::from_result(op, Ok(get_vertical_metrics(engine, &req))),
        Request::FeedbackSummary(req) => Response::from_result(op, get_feedback_summary(engine, &req).await),
        Request::Status => Response::from_result(op, Ok(get_engine_status(engine))),
    }
}

/// Parse and run one JSON line
pub async fn dispatch_line(engine: &RiskEngine, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(engine, request).await,
        Err(e) => Response::failure("unknown", CommandError::new("bad_request", e.to_string())),
    }
}
