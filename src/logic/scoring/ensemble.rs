//! Score Aggregator
//!
//! Weighted rule score, optional model blend, threshold bucketing.
//!
//! ```text
//! rule_raw   = max(0, round(Σ base_score × weight[rule_id]))
//! rule_score = min(rule_raw, 100)
//! final      = round(rule_score × Wr + model_score × Wm)   (model scored)
//!            = rule_score                                 (otherwise)
//! ```

use crate::logic::policy::VerticalPolicy;
use crate::logic::rules::Flag;

use super::types::{Decision, FlagContribution, ModelOutcome, RiskLevel, ScoreBreakdown};

/// Scores are bucketed on a 0..=100 scale
pub const MAX_SCORE: u32 = 100;

/// Combine already-ordered flags with the model outcome under one policy
pub fn aggregate(flags: Vec<Flag>, policy: &VerticalPolicy, model: &ModelOutcome) -> ScoreBreakdown {
    let contributions: Vec<FlagContribution> = flags
        .into_iter()
        .map(|flag| {
            let weight = policy.weight(&flag.rule_id);
            let weighted_score = flag.score as f64 * weight;
            FlagContribution {
                flag,
                weight,
                weighted_score,
            }
        })
        .collect();

    let rule_score_raw = to_score(contributions.iter().map(|c| c.weighted_score).sum());
    let rule_score = rule_score_raw.min(MAX_SCORE);

    let model_score = model.probability().map(probability_to_score);
    let final_score = match model_score {
        Some(m) => blend(rule_score, m, policy),
        None => rule_score,
    };

    ScoreBreakdown {
        contributions,
        rule_score_raw,
        rule_score,
        model_score,
        model_status: model.status(),
        final_score,
        risk_level: risk_level(final_score, policy),
        decision: decide(final_score, policy),
    }
}

fn to_score(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round().min(u32::MAX as f64) as u32
}

/// Probability in [0, 1] to a 0..=100 score
pub fn probability_to_score(p: f64) -> u32 {
    to_score(p.clamp(0.0, 1.0) * MAX_SCORE as f64)
}

fn blend(rule_score: u32, model_score: u32, policy: &VerticalPolicy) -> u32 {
    let w = policy.ensemble;
    to_score(rule_score as f64 * w.rule_weight + model_score as f64 * w.model_weight).min(MAX_SCORE)
}

/// Equality goes to the stricter bucket
pub fn decide(score: u32, policy: &VerticalPolicy) -> Decision {
    if score >= policy.decline_threshold {
        Decision::Decline
    } else if score >= policy.review_threshold {
        Decision::Review
    } else {
        Decision::Approve
    }
}

/// Critical at decline, high at review, medium from half the review threshold
pub fn risk_level(score: u32, policy: &VerticalPolicy) -> RiskLevel {
    if score >= policy.decline_threshold {
        RiskLevel::Critical
    } else if score >= policy.review_threshold {
        RiskLevel::High
    } else if score >= policy.review_threshold / 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
