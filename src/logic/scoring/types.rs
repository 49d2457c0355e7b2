//! Scoring Types
//!
//! Decision, risk level, degradations and the final DecisionResult.
//! KHÔNG chứa logic tính điểm - chỉ data structures.

use serde::{Deserialize, Serialize};

use crate::logic::rules::Flag;

// ============================================================================
// DECISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Review,
    Decline,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Review => "review",
            Decision::Decline => "decline",
        }
    }

    /// Review or decline
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Decision::Approve)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// RISK LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DEGRADATION
// ============================================================================

/// An input the decision was produced without
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    ModelTimeout,
    ModelError { message: String },
    DeadlineExceeded { stage: String },
    SignalUnavailable { provider: String },
    RuleFailed { rule_id: String },
}

impl Degradation {
    /// Rule failures are recorded but fail-open, so they do not mark the
    /// decision degraded on their own.
    pub fn marks_degraded(&self) -> bool {
        !matches!(self, Degradation::RuleFailed { .. })
    }
}

// ============================================================================
// MODEL OUTCOME
// ============================================================================

/// How the model leg of the ensemble went
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// Probability in [0, 1]
    Scored(f64),
    TimedOut,
    Failed(String),
    /// No oracle wired into the engine
    NotConfigured,
    /// Vertical policy turned the model off
    Disabled,
    /// Pipeline deadline already spent before the oracle could be called
    Skipped,
}

impl ModelOutcome {
    pub fn status(&self) -> ModelStatus {
        match self {
            ModelOutcome::Scored(_) => ModelStatus::Scored,
            ModelOutcome::TimedOut => ModelStatus::Timeout,
            ModelOutcome::Failed(_) => ModelStatus::Error,
            ModelOutcome::NotConfigured => ModelStatus::NotConfigured,
            ModelOutcome::Disabled => ModelStatus::Disabled,
            ModelOutcome::Skipped => ModelStatus::Skipped,
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            ModelOutcome::Scored(p) => Some(*p),
            _ => None,
        }
    }

    pub fn degradation(&self) -> Option<Degradation> {
        match self {
            ModelOutcome::TimedOut => Some(Degradation::ModelTimeout),
            ModelOutcome::Failed(message) => Some(Degradation::ModelError {
                message: message.clone(),
            }),
            ModelOutcome::Skipped => Some(Degradation::DeadlineExceeded {
                stage: "model".to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Scored,
    Timeout,
    Error,
    NotConfigured,
    Disabled,
    Skipped,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Scored => "scored",
            ModelStatus::Timeout => "timeout",
            ModelStatus::Error => "error",
            ModelStatus::NotConfigured => "not_configured",
            ModelStatus::Disabled => "disabled",
            ModelStatus::Skipped => "skipped",
        }
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// One triggered flag and what it added to the rule score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagContribution {
    #[serde(flatten)]
    pub flag: Flag,
    /// Vertical multiplier applied to the base score
    pub weight: f64,
    /// base score × weight, before rounding
    pub weighted_score: f64,
}

/// Score breakdown produced by the ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub contributions: Vec<FlagContribution>,
    /// round(Σ weighted), floor 0, unclamped
    pub rule_score_raw: u32,
    /// rule_score_raw clamped to [0, 100]
    pub rule_score: u32,
    pub model_score: Option<u32>,
    pub model_status: ModelStatus,
    pub final_score: u32,
    pub risk_level: RiskLevel,
    pub decision: Decision,
}

/// Immutable outcome of one `check_transaction` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub transaction_id: String,
    pub vertical: String,
    pub final_score: u32,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    /// Ordered: severity desc, score desc, rule id asc
    pub flags: Vec<FlagContribution>,
    pub rule_score_raw: u32,
    pub rule_score: u32,
    pub model_score: Option<u32>,
    pub model_status: ModelStatus,
    pub degraded: bool,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    pub policy_version: u64,
    pub processing_time_us: u64,
}

impl DecisionResult {
    pub fn new(
        transaction_id: &str,
        vertical: &str,
        breakdown: ScoreBreakdown,
        degradations: Vec<Degradation>,
        policy_version: u64,
    ) -> Self {
        let degraded = degradations.iter().any(Degradation::marks_degraded);
        Self {
            transaction_id: transaction_id.to_string(),
            vertical: vertical.to_string(),
            final_score: breakdown.final_score,
            risk_level: breakdown.risk_level,
            decision: breakdown.decision,
            flags: breakdown.contributions,
            rule_score_raw: breakdown.rule_score_raw,
            rule_score: breakdown.rule_score,
            model_score: breakdown.model_score,
            model_status: breakdown.model_status,
            degraded,
            degradations,
            policy_version,
            processing_time_us: 0,
        }
    }

    pub fn with_processing_time(mut self, micros: u64) -> Self {
        self.processing_time_us = micros;
        self
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.flags.iter().map(|c| c.flag.rule_id.as_str()).collect()
    }

    pub fn is_flagged(&self) -> bool {
        self.decision.is_flagged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradation_serializes_with_kind_tag() {
        let json = serde_json::to_value(Degradation::SignalUnavailable {
            provider: "device-intel".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "signal_unavailable");
        assert_eq!(json["provider"], "device-intel");

        let json = serde_json::to_value(Degradation::ModelTimeout).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "model_timeout"}));
    }

    #[test]
    fn test_rule_failure_does_not_degrade() {
        assert!(!Degradation::RuleFailed { rule_id: "X".into() }.marks_degraded());
        assert!(Degradation::ModelTimeout.marks_degraded());
    }

    #[test]
    fn test_model_outcome_mapping() {
        assert_eq!(ModelOutcome::Scored(0.2).probability(), Some(0.2));
        assert_eq!(ModelOutcome::TimedOut.degradation(), Some(Degradation::ModelTimeout));
        assert_eq!(ModelOutcome::Disabled.degradation(), None);
        assert_eq!(ModelOutcome::NotConfigured.status().as_str(), "not_configured");
        assert!(matches!(
            ModelOutcome::Skipped.degradation(),
            Some(Degradation::DeadlineExceeded { stage }) if stage == "model"
        ));
    }
}
