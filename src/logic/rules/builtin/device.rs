//! Device reputation rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::scaled_confidence;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("EMULATOR_DEVICE", "Emulated Device", RuleCategory::Device, Severity::High, 30)
                .describe("Device reputation reports an emulator"),
            emulator_device,
        ),
        Rule::native(
            RuleMeta::new("ROOTED_DEVICE", "Rooted or Jailbroken Device", RuleCategory::Device, Severity::Medium, 15)
                .describe("Device reputation reports root/jailbreak"),
            rooted_device,
        ),
        Rule::native(
            RuleMeta::new("HIGH_RISK_DEVICE", "High Risk Device", RuleCategory::Device, Severity::High, 30)
                .describe("Device reputation score of 80 or more"),
            high_risk_device,
        ),
        Rule::native(
            RuleMeta::new("NEW_DEVICE_HIGH_VALUE", "First-Seen Device High Value", RuleCategory::Device, Severity::Medium, 15)
                .describe("Device never seen in 30 days used for a 2,000+ transaction"),
            new_device_high_value,
        ),
    ]
}

fn emulator_device(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(ctx
        .is_true(fields::DEVICE_EMULATOR)?
        .then(|| RuleHit::new(0.9, "Transaction from an emulated device")))
}

fn rooted_device(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(ctx
        .is_true(fields::DEVICE_ROOTED)?
        .then(|| RuleHit::new(0.7, "Transaction from a rooted device")))
}

fn high_risk_device(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::DEVICE_RISK_SCORE)? {
        Some(score) if score >= 80.0 => Ok(Some(
            RuleHit::new(
                scaled_confidence(score, 80.0, 100.0, 0.7),
                format!("Device risk score {:.0}", score),
            )
            .with_meta("device_risk_score", score),
        )),
        _ => Ok(None),
    }
}

fn new_device_high_value(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(seen), Some(amount)) = (ctx.num("device_count_30d")?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if seen > 0.0 || amount < 2_000.0 {
        return Ok(None);
    }
    Ok(Some(RuleHit::new(
        0.55,
        format!("First transaction on this device is {:.2}", amount),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_signal_does_not_trigger() {
        let ctx = TransactionContext::builder().build();
        assert!(emulator_device(&ctx).unwrap().is_none());
        assert!(high_risk_device(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_new_device() {
        let ctx = TransactionContext::builder()
            .set("device_count_30d", 0.0)
            .set(fields::AMOUNT, 2_500.0)
            .build();
        assert!(new_device_high_value(&ctx).unwrap().is_some());
    }
}
