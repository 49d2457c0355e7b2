//! Feature Layout - Model Input Definition
//!
//! **CRITICAL: This file controls the schema the scoring oracle was trained on**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Every name here is a context field (see `context::fields`). Booleans encode
//! as 0/1, absent fields as `NaN` (serialized as JSON `null`).

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::logic::context::{FieldValue, TransactionContext};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Transaction (0-2) ===
    "amount",                    // 0
    "account_age_days",          // 1
    "hour_of_day",               // 2

    // === User velocity (3-8) ===
    "user_count_1h",             // 3
    "user_count_24h",            // 4
    "user_sum_24h",              // 5
    "user_count_7d",             // 6
    "user_distinct_30d",         // 7: devices seen for this user
    "user_avg_amount_30d",       // 8

    // === Device / network velocity (9-11) ===
    "device_distinct_30d",       // 9: accounts on this device
    "ip_distinct_24h",           // 10: accounts behind this address
    "device_count_1h",           // 11

    // === Derived (12-13) ===
    "email_local_digits_ratio",  // 12
    "geo_mismatch",              // 13

    // === Signals (14-22) ===
    "device_risk_score",         // 14
    "device_emulator",           // 15
    "device_rooted",             // 16
    "ip_risk_score",             // 17
    "ip_proxy",                  // 18
    "ip_tor",                    // 19
    "identity_verified",         // 20
    "identity_match_score",      // 21
    "consortium_fraud_reports",  // 22
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 23;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the version and the ordered feature names
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

static LAYOUT_HASH: Lazy<u32> = Lazy::new(compute_layout_hash);

pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Reject a model trained against another layout
pub fn validate_layout(hash: u32) -> Result<(), ModelError> {
    let expected = layout_hash();
    if hash != expected {
        return Err(ModelError::LayoutMismatch { expected, found: hash });
    }
    Ok(())
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// What the oracle receives for one transaction
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    /// `NaN` = missing
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn from_context(ctx: &TransactionContext) -> Self {
        let values = FEATURE_LAYOUT
            .iter()
            .map(|name| match ctx.get(name) {
                Some(FieldValue::Num(n)) => *n as f32,
                Some(FieldValue::Bool(b)) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => f32::NAN,
            })
            .collect();

        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        feature_index(name).and_then(|i| self.values.get(i).copied())
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::context::fields;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_stable_and_validated() {
        assert_eq!(compute_layout_hash(), layout_hash());
        assert!(validate_layout(layout_hash()).is_ok());
        assert!(matches!(
            validate_layout(layout_hash().wrapping_add(1)),
            Err(ModelError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_layout_names_are_context_fields() {
        assert_eq!(feature_index(fields::AMOUNT), Some(0));
        assert!(feature_index(fields::GEO_MISMATCH).is_some());
        assert!(feature_index(fields::DEVICE_RISK_SCORE).is_some());
        assert!(feature_index(fields::USER_AVG_AMOUNT_30D).is_some());
    }

    #[test]
    fn test_vector_encodes_bools_and_missing() {
        let ctx = TransactionContext::builder()
            .set(fields::AMOUNT, 120.0)
            .set(fields::IP_TOR, true)
            .set(fields::GEO_MISMATCH, false)
            .set(fields::DEVICE_RISK_SCORE, "n/a")
            .build();
        let v = FeatureVector::from_context(&ctx);

        assert_eq!(v.values.len(), FEATURE_COUNT);
        assert_eq!(v.get("amount"), Some(120.0));
        assert_eq!(v.get("ip_tor"), Some(1.0));
        assert_eq!(v.get("geo_mismatch"), Some(0.0));
        assert!(v.get("device_risk_score").unwrap().is_nan());
        assert_eq!(v.missing_count(), FEATURE_COUNT - 3);

        let json = serde_json::to_value(&v).unwrap();
        assert!(json["values"][1].is_null());
    }
}
