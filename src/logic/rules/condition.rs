//! Declarative Conditions
//!
//! JSON-authored rule conditions, compiled once at load time.
//! Regexes are compiled here so a bad pattern is a load error, never a
//! request-time one.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RuleError};
use crate::logic::context::{FieldValue, TransactionContext};

use super::types::RuleHit;

// ============================================================================
// AUTHORED FORM
// ============================================================================

/// Condition over context fields. Absent fields never satisfy a leaf
/// condition; a field present with the wrong type is a rule error.
/// `not` is false whenever a field its inner condition compares is absent,
/// so negation never turns a missing signal into a hit. Use `absent` to
/// match on missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Present { field: String },
    Absent { field: String },
    IsTrue { field: String },
    IsFalse { field: String },

    NumAbove { field: String, value: f64 },
    NumAtLeast { field: String, value: f64 },
    NumBelow { field: String, value: f64 },
    /// Inclusive on both ends
    NumBetween { field: String, min: f64, max: f64 },

    Equals { field: String, value: serde_json::Value },
    OneOf { field: String, values: Vec<serde_json::Value> },
    Matches { field: String, pattern: String },

    // Composite
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compile(&self, rule_id: &str) -> Result<CompiledCondition, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidRule {
            rule_id: rule_id.to_string(),
            reason,
        };

        Ok(match self {
            Condition::Present { field } => CompiledCondition::Present(field.clone()),
            Condition::Absent { field } => CompiledCondition::Absent(field.clone()),
            Condition::IsTrue { field } => CompiledCondition::Flag(field.clone(), true),
            Condition::IsFalse { field } => CompiledCondition::Flag(field.clone(), false),

            Condition::NumAbove { field, value } => {
                CompiledCondition::Num(field.clone(), NumCmp::Above(finite(*value, &invalid)?))
            }
            Condition::NumAtLeast { field, value } => {
                CompiledCondition::Num(field.clone(), NumCmp::AtLeast(finite(*value, &invalid)?))
            }
            Condition::NumBelow { field, value } => {
                CompiledCondition::Num(field.clone(), NumCmp::Below(finite(*value, &invalid)?))
            }
            Condition::NumBetween { field, min, max } => {
                let (min, max) = (finite(*min, &invalid)?, finite(*max, &invalid)?);
                if min > max {
                    return Err(invalid(format!("num_between on '{}' has min > max", field)));
                }
                CompiledCondition::Num(field.clone(), NumCmp::Between(min, max))
            }

            Condition::Equals { field, value } => {
                CompiledCondition::OneOf(field.clone(), vec![scalar(value, &invalid)?])
            }
            Condition::OneOf { field, values } => {
                if values.is_empty() {
                    return Err(invalid(format!("one_of on '{}' has no values", field)));
                }
                let values = values
                    .iter()
                    .map(|v| scalar(v, &invalid))
                    .collect::<Result<Vec<_>, _>>()?;
                CompiledCondition::OneOf(field.clone(), values)
            }
            Condition::Matches { field, pattern } => {
                let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    rule_id: rule_id.to_string(),
                    pattern: pattern.clone(),
                    source,
                })?;
                CompiledCondition::Matches(field.clone(), regex)
            }

            Condition::All(children) | Condition::Any(children) => {
                if children.is_empty() {
                    return Err(invalid("empty composite condition".to_string()));
                }
                let compiled = children
                    .iter()
                    .map(|c| c.compile(rule_id))
                    .collect::<Result<Vec<_>, _>>()?;
                if matches!(self, Condition::All(_)) {
                    CompiledCondition::All(compiled)
                } else {
                    CompiledCondition::Any(compiled)
                }
            }
            Condition::Not(inner) => CompiledCondition::Not(Box::new(inner.compile(rule_id)?)),
        })
    }
}

fn finite(value: f64, invalid: &impl Fn(String) -> ConfigError) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid("non-finite numeric literal".to_string()))
    }
}

fn scalar(
    value: &serde_json::Value,
    invalid: &impl Fn(String) -> ConfigError,
) -> Result<serde_json::Value, ConfigError> {
    match value {
        serde_json::Value::String(_) | serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
            Ok(value.clone())
        }
        other => Err(invalid(format!("literal {} is not a scalar", other))),
    }
}

// ============================================================================
// COMPILED FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumCmp {
    Above(f64),
    AtLeast(f64),
    Below(f64),
    Between(f64, f64),
}

impl NumCmp {
    fn holds(&self, n: f64) -> bool {
        match *self {
            NumCmp::Above(v) => n > v,
            NumCmp::AtLeast(v) => n >= v,
            NumCmp::Below(v) => n < v,
            NumCmp::Between(lo, hi) => n >= lo && n <= hi,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompiledCondition {
    Present(String),
    Absent(String),
    Flag(String, bool),
    Num(String, NumCmp),
    OneOf(String, Vec<serde_json::Value>),
    Matches(String, Regex),
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
}

impl CompiledCondition {
    pub fn evaluate(&self, ctx: &TransactionContext) -> Result<bool, RuleError> {
        match self {
            CompiledCondition::Present(field) => Ok(ctx.contains(field)),
            CompiledCondition::Absent(field) => Ok(!ctx.contains(field)),
            CompiledCondition::Flag(field, expected) => Ok(ctx.flag(field)? == Some(*expected)),
            CompiledCondition::Num(field, cmp) => Ok(ctx.num(field)?.map_or(false, |n| cmp.holds(n))),
            CompiledCondition::OneOf(field, literals) => {
                let Some(value) = ctx.get(field) else {
                    return Ok(false);
                };
                for literal in literals {
                    check_literal_type(field, value, literal)?;
                }
                Ok(literals.iter().any(|lit| value.matches_json(lit)))
            }
            CompiledCondition::Matches(field, regex) => {
                Ok(ctx.text(field)?.map_or(false, |s| regex.is_match(s)))
            }
            CompiledCondition::All(children) => {
                for child in children {
                    if !child.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CompiledCondition::Any(children) => {
                for child in children {
                    if child.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            CompiledCondition::Not(inner) => {
                let mut compared = Vec::new();
                inner.compared_fields(&mut compared);
                if compared.iter().any(|f| !ctx.contains(f)) {
                    return Ok(false);
                }
                Ok(!inner.evaluate(ctx)?)
            }
        }
    }

    /// Fields whose value is compared; `present`/`absent` only test existence
    fn compared_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CompiledCondition::Present(_) | CompiledCondition::Absent(_) => {}
            CompiledCondition::Flag(f, _)
            | CompiledCondition::Num(f, _)
            | CompiledCondition::OneOf(f, _)
            | CompiledCondition::Matches(f, _) => out.push(f.as_str()),
            CompiledCondition::All(children) | CompiledCondition::Any(children) => {
                children.iter().for_each(|c| c.compared_fields(out))
            }
            CompiledCondition::Not(inner) => inner.compared_fields(out),
        }
    }

    /// Fields this condition reads
    pub fn fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CompiledCondition::Present(f)
            | CompiledCondition::Absent(f)
            | CompiledCondition::Flag(f, _)
            | CompiledCondition::Num(f, _)
            | CompiledCondition::OneOf(f, _)
            | CompiledCondition::Matches(f, _) => out.push(f.as_str()),
            CompiledCondition::All(children) | CompiledCondition::Any(children) => {
                children.iter().for_each(|c| c.fields(out))
            }
            CompiledCondition::Not(inner) => inner.fields(out),
        }
    }
}

fn check_literal_type(field: &str, value: &FieldValue, literal: &serde_json::Value) -> Result<(), RuleError> {
    let compatible = matches!(
        (value, literal),
        (FieldValue::Str(_), serde_json::Value::String(_))
            | (FieldValue::Timestamp(_), serde_json::Value::String(_))
            | (FieldValue::Num(_), serde_json::Value::Number(_))
            | (FieldValue::Bool(_), serde_json::Value::Bool(_))
    );
    if compatible {
        return Ok(());
    }

    let expected = match literal {
        serde_json::Value::String(_) => "string",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::Bool(_) => "boolean",
        _ => "scalar",
    };
    Err(RuleError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: value.type_name(),
    })
}

// ============================================================================
// DECLARATIVE RULE BODY
// ============================================================================

/// Compiled body of a config-loaded rule
#[derive(Debug, Clone)]
pub struct DeclarativeLogic {
    conditions: Vec<CompiledCondition>,
    confidence: f64,
    /// `{field}` placeholders are filled from the context
    message: String,
}

impl DeclarativeLogic {
    pub fn new(conditions: Vec<CompiledCondition>, confidence: f64, message: &str) -> Self {
        Self {
            conditions,
            confidence,
            message: message.to_string(),
        }
    }

    pub fn evaluate(&self, ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
        for condition in &self.conditions {
            if !condition.evaluate(ctx)? {
                return Ok(None);
            }
        }

        let mut fields = Vec::new();
        self.conditions.iter().for_each(|c| c.fields(&mut fields));
        fields.sort_unstable();
        fields.dedup();

        let mut hit = RuleHit::new(self.confidence, render_message(&self.message, ctx));
        for field in fields {
            if let Some(value) = ctx.get(field) {
                hit = hit.with_meta(field, value.to_string());
            }
        }
        Ok(Some(hit))
    }
}

fn render_message(template: &str, ctx: &TransactionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match ctx.get(name) {
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> TransactionContext {
        TransactionContext::builder()
            .set("amount", 1200.0)
            .set("email_domain", "mailinator.com")
            .set("ip_tor", true)
            .set("identity_verified", false)
            .build()
    }

    fn compile(value: serde_json::Value) -> CompiledCondition {
        let cond: Condition = serde_json::from_value(value).unwrap();
        cond.compile("TEST").unwrap()
    }

    #[test]
    fn test_numeric_conditions() {
        let c = ctx();
        assert!(compile(json!({"num_above": {"field": "amount", "value": 1000}})).evaluate(&c).unwrap());
        assert!(compile(json!({"num_at_least": {"field": "amount", "value": 1200}})).evaluate(&c).unwrap());
        assert!(!compile(json!({"num_below": {"field": "amount", "value": 1200}})).evaluate(&c).unwrap());
        assert!(compile(json!({"num_between": {"field": "amount", "min": 1000, "max": 1200}}))
            .evaluate(&c)
            .unwrap());
    }

    #[test]
    fn test_absent_field_never_matches_leaf() {
        let c = ctx();
        assert!(!compile(json!({"num_above": {"field": "missing", "value": 0}})).evaluate(&c).unwrap());
        assert!(!compile(json!({"is_false": {"field": "missing"}})).evaluate(&c).unwrap());
        assert!(compile(json!({"absent": {"field": "missing"}})).evaluate(&c).unwrap());
        assert!(compile(json!({"is_false": {"field": "identity_verified"}})).evaluate(&c).unwrap());
    }

    #[test]
    fn test_not_over_absent_field_is_false() {
        let c = ctx();
        assert!(!compile(json!({"not": {"is_true": {"field": "missing"}}})).evaluate(&c).unwrap());
        assert!(!compile(json!({"not": {"num_above": {"field": "missing", "value": 0}}})).evaluate(&c).unwrap());
        assert!(!compile(json!({"not": {"not": {"is_true": {"field": "missing"}}}})).evaluate(&c).unwrap());

        // present fields negate normally
        assert!(compile(json!({"not": {"is_true": {"field": "identity_verified"}}})).evaluate(&c).unwrap());
        assert!(!compile(json!({"not": {"is_true": {"field": "ip_tor"}}})).evaluate(&c).unwrap());
        // existence tests stay negatable
        assert!(compile(json!({"not": {"present": {"field": "missing"}}})).evaluate(&c).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_rule_error() {
        let c = ctx();
        let err = compile(json!({"num_above": {"field": "email_domain", "value": 1}}))
            .evaluate(&c)
            .unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));

        let err = compile(json!({"equals": {"field": "amount", "value": "1200"}}))
            .evaluate(&c)
            .unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { expected: "string", found: "number", .. }));
    }

    #[test]
    fn test_composites() {
        let c = ctx();
        let cond = compile(json!({"all": [
            {"is_true": {"field": "ip_tor"}},
            {"any": [
                {"one_of": {"field": "email_domain", "values": ["yopmail.com", "MAILINATOR.com"]}},
                {"matches": {"field": "email_domain", "pattern": "^temp"}}
            ]},
            {"not": {"present": {"field": "device_id"}}}
        ]}));
        assert!(cond.evaluate(&c).unwrap());
    }

    #[test]
    fn test_invalid_pattern_rejected_at_compile() {
        let cond: Condition =
            serde_json::from_value(json!({"matches": {"field": "email", "pattern": "(unclosed"}})).unwrap();
        assert!(matches!(cond.compile("R1"), Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_message_template() {
        let logic = DeclarativeLogic::new(
            vec![compile(json!({"is_true": {"field": "ip_tor"}}))],
            0.9,
            "Tor exit node, amount {amount} {unknown}",
        );
        let hit = logic.evaluate(&ctx()).unwrap().unwrap();
        assert_eq!(hit.message, "Tor exit node, amount 1200 {unknown}");
        assert_eq!(hit.metadata.get("ip_tor"), Some(&json!("true")));
    }
}
