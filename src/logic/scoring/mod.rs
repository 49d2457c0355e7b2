//! Scoring Module - Score Aggregator (Ensemble)
//!
//! Turns ordered flags plus an optional model probability into one
//! explainable decision under a vertical policy.
//!
//! ## Structure
//! - `types`: Decision, RiskLevel, Degradation, DecisionResult
//! - `ensemble`: Weighted rule score, blend, threshold bucketing

pub mod types;
pub mod ensemble;

pub use types::{
    Decision, DecisionResult, Degradation, FlagContribution, ModelOutcome, ModelStatus, RiskLevel,
    ScoreBreakdown,
};
pub use ensemble::{aggregate, decide, probability_to_score, risk_level, MAX_SCORE};
