//! Storage Types
//!
//! Persisted shapes: one record per decision (result + context snapshot) and
//! one per labelled outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::context::TransactionContext;
use crate::logic::scoring::{Decision, DecisionResult};

/// Everything needed to audit or relabel a decision without re-deriving velocity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub result: DecisionResult,
    pub context: TransactionContext,
    /// sha256 hex of the canonical context JSON
    pub context_fingerprint: String,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(result: DecisionResult, context: TransactionContext) -> Self {
        let context_fingerprint = context.fingerprint();
        Self {
            result,
            context,
            context_fingerprint,
            recorded_at: Utc::now(),
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.result.transaction_id
    }

    /// Fingerprint still matches the stored context
    pub fn verify(&self) -> bool {
        self.context.fingerprint() == self.context_fingerprint
    }
}

/// Actual outcome joined with what was predicted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub transaction_id: String,
    pub vertical: String,
    pub actual_fraud: bool,
    #[serde(default)]
    pub notes: String,
    pub predicted_decision: Decision,
    pub final_score: u32,
    pub rule_ids: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn from_decision(decision: &DecisionResult, actual_fraud: bool, notes: &str) -> Self {
        Self {
            transaction_id: decision.transaction_id.clone(),
            vertical: decision.vertical.clone(),
            actual_fraud,
            notes: notes.to_string(),
            predicted_decision: decision.decision,
            final_score: decision.final_score,
            rule_ids: decision.rule_ids().into_iter().map(str::to_string).collect(),
            recorded_at: Utc::now(),
        }
    }

    /// Review or decline counts as a positive prediction
    pub fn predicted_fraud(&self) -> bool {
        self.predicted_decision.is_flagged()
    }
}
