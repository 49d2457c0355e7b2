//! Built-in Rules
//!
//! Native rule families compiled into the catalog. New rules are added by
//! extending a family's `rules()` list.

pub mod velocity;
pub mod amount;
pub mod account;
pub mod device;
pub mod network;
pub mod identity;
pub mod behavioral;
pub mod lending;
pub mod crypto;
pub mod commerce;
pub mod gaming;

use super::types::Rule;

/// Every native rule, in family order
pub fn all_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    rules.extend(velocity::rules());
    rules.extend(amount::rules());
    rules.extend(account::rules());
    rules.extend(device::rules());
    rules.extend(network::rules());
    rules.extend(identity::rules());
    rules.extend(behavioral::rules());
    rules.extend(lending::rules());
    rules.extend(crypto::rules());
    rules.extend(commerce::rules());
    rules.extend(gaming::rules());
    rules
}

/// Confidence that grows with how far `value` is past `threshold`,
/// reaching 1.0 at `saturation`.
pub(crate) fn scaled_confidence(value: f64, threshold: f64, saturation: f64, floor: f64) -> f64 {
    if saturation <= threshold {
        return 1.0;
    }
    let t = ((value - threshold) / (saturation - threshold)).clamp(0.0, 1.0);
    floor + (1.0 - floor) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_confidence() {
        assert_eq!(scaled_confidence(5.0, 5.0, 10.0, 0.6), 0.6);
        assert_eq!(scaled_confidence(10.0, 5.0, 10.0, 0.6), 1.0);
        assert_eq!(scaled_confidence(50.0, 5.0, 10.0, 0.6), 1.0);
    }

    #[test]
    fn test_every_rule_has_description() {
        for rule in all_rules() {
            assert!(!rule.meta.description.is_empty(), "{} has no description", rule.id());
            assert!(rule.meta.base_score <= 100, "{} score too high", rule.id());
        }
    }
}
