//! Feedback Types
//!
//! Read-only calibration report over labelled outcomes.
//! KHÔNG chứa recalibration - chỉ counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How often a rule fired on labelled traffic and how often it was right
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFeedback {
    pub triggered: u64,
    pub confirmed_fraud: u64,
}

impl RuleFeedback {
    pub fn precision(&self) -> Option<f64> {
        ratio(self.confirmed_fraud, self.triggered)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    /// None = every vertical
    pub vertical: Option<String>,
    pub labelled: u64,
    pub actual_fraud: u64,
    /// Flagged (review or decline) and fraud
    pub true_positives: u64,
    /// Flagged and legitimate
    pub false_positives: u64,
    /// Approved and fraud
    pub false_negatives: u64,
    pub true_negatives: u64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub rules: BTreeMap<String, RuleFeedback>,
}

pub(crate) fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}
