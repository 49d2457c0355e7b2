//! Context Types
//!
//! The flat, typed evaluation context built once per transaction.
//! KHÔNG chứa logic build - chỉ data structures và typed accessors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RuleError;

// ============================================================================
// FIELD VALUE
// ============================================================================

/// A single typed context value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Str(_) => "string",
            FieldValue::Num(_) => "number",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    /// Convert a scalar JSON value. Arrays, objects, null and non-finite
    /// numbers have no context representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(FieldValue::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(FieldValue::Num),
            _ => None,
        }
    }

    /// Compare with a JSON literal from a declarative rule
    pub fn matches_json(&self, literal: &serde_json::Value) -> bool {
        match (self, literal) {
            (FieldValue::Str(a), serde_json::Value::String(b)) => a.eq_ignore_ascii_case(b),
            (FieldValue::Bool(a), serde_json::Value::Bool(b)) => a == b,
            (FieldValue::Num(a), serde_json::Value::Number(b)) => {
                b.as_f64().map_or(false, |b| (a - b).abs() < f64::EPSILON)
            }
            (FieldValue::Timestamp(a), serde_json::Value::String(b)) => {
                DateTime::parse_from_rfc3339(b).map_or(false, |b| b.with_timezone(&Utc) == *a)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Num(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Num(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

// ============================================================================
// TRANSACTION CONTEXT
// ============================================================================

/// Immutable field map handed to every rule.
///
/// There is no mutating API once built; rules only ever see `&TransactionContext`.
/// Absent fields are distinct from `false`/`0`: every accessor returns
/// `Ok(None)` for an absent field and an error only when the field is present
/// with another type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionContext {
    fields: BTreeMap<String, FieldValue>,
}

impl TransactionContext {
    pub fn builder() -> ContextFields {
        ContextFields::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Numeric field
    pub fn num(&self, field: &str) -> Result<Option<f64>, RuleError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(FieldValue::Num(n)) => Ok(Some(*n)),
            Some(other) => Err(mismatch(field, "number", other)),
        }
    }

    /// String field
    pub fn text(&self, field: &str) -> Result<Option<&str>, RuleError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(FieldValue::Str(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(field, "string", other)),
        }
    }

    /// Boolean field
    pub fn flag(&self, field: &str) -> Result<Option<bool>, RuleError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(FieldValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(field, "boolean", other)),
        }
    }

    /// Timestamp field
    pub fn timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, RuleError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(FieldValue::Timestamp(t)) => Ok(Some(*t)),
            Some(other) => Err(mismatch(field, "timestamp", other)),
        }
    }

    /// `true` only when the field is present and true
    pub fn is_true(&self, field: &str) -> Result<bool, RuleError> {
        Ok(self.flag(field)? == Some(true))
    }

    /// Numeric field, absent treated as zero. Only for counters where
    /// "never observed" and "zero" mean the same thing.
    pub fn count(&self, field: &str) -> Result<f64, RuleError> {
        Ok(self.num(field)?.unwrap_or(0.0))
    }

    /// SHA-256 over the canonical JSON form (BTreeMap keeps keys ordered)
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&self.fields).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }
}

fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> RuleError {
    RuleError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.type_name(),
    }
}

// ============================================================================
// CONTEXT FIELDS (mutable, pre-build)
// ============================================================================

/// Mutable field accumulator; consumed by [`ContextFields::build`].
#[derive(Debug, Clone, Default)]
pub struct ContextFields {
    fields: BTreeMap<String, FieldValue>,
}

impl ContextFields {
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set only when a value is present
    pub fn set_opt<V: Into<FieldValue>>(mut self, field: impl Into<String>, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.fields.insert(field.into(), v.into());
        }
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Insert unless the field already exists. Returns false on collision.
    pub fn insert_new(&mut self, field: impl Into<String>, value: FieldValue) -> bool {
        match self.fields.entry(field.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn build(self) -> TransactionContext {
        TransactionContext { fields: self.fields }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_not_false() {
        let ctx = TransactionContext::builder()
            .set("verified", false)
            .build();

        assert_eq!(ctx.flag("verified"), Ok(Some(false)));
        assert_eq!(ctx.flag("missing"), Ok(None));
        assert!(!ctx.is_true("missing").unwrap());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let ctx = TransactionContext::builder().set("amount", "lots").build();

        let err = ctx.num("amount").unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { expected: "number", found: "string", .. }));
    }

    #[test]
    fn test_fingerprint_stable_across_insert_order() {
        let a = TransactionContext::builder()
            .set("a", 1.0)
            .set("b", "x")
            .build();
        let b = TransactionContext::builder()
            .set("b", "x")
            .set("a", 1.0)
            .build();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_from_json_rejects_nested() {
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(3)),
            Some(FieldValue::Num(3.0))
        );
        assert!(FieldValue::from_json(&serde_json::json!({"a": 1})).is_none());
        assert!(FieldValue::from_json(&serde_json::json!(null)).is_none());
    }

    #[test]
    fn test_insert_new_keeps_first() {
        let mut fields = ContextFields::default();
        assert!(fields.insert_new("amount", FieldValue::Num(1.0)));
        assert!(!fields.insert_new("amount", FieldValue::Num(2.0)));
        assert_eq!(fields.build().num("amount"), Ok(Some(1.0)));
    }
}
