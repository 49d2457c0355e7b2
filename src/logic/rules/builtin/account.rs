//! Account age and account-takeover rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::amount::LARGE_AMOUNT;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("NEW_ACCOUNT_LARGE_AMOUNT", "New Account Large Amount", RuleCategory::Account, Severity::High, 35)
                .describe("Account younger than 7 days moving 10,000 or more"),
            new_account_large_amount,
        ),
        Rule::native(
            RuleMeta::new("BRAND_NEW_ACCOUNT", "Account Created Today", RuleCategory::Account, Severity::Low, 10)
                .describe("Account younger than 24 hours"),
            brand_new_account,
        ),
        Rule::native(
            RuleMeta::new("RECENT_PASSWORD_RESET", "Recent Password Reset", RuleCategory::Account, Severity::Medium, 20)
                .describe("Password reset within the last 24 hours"),
            recent_password_reset,
        ),
        Rule::native(
            RuleMeta::new("PROFILE_CHANGE_BEFORE_PAYOUT", "Profile Changed Before Large Transaction", RuleCategory::Account, Severity::Medium, 20)
                .describe("Profile changed within 48 hours of a 1,000+ transaction"),
            profile_change_before_payout,
        ),
    ]
}

fn new_account_large_amount(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(age), Some(amount)) = (ctx.num(fields::ACCOUNT_AGE_DAYS)?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if age >= 7.0 || amount < LARGE_AMOUNT {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            if age < 1.0 { 0.95 } else { 0.85 },
            format!("Account {:.1} days old moving {:.2}", age, amount),
        )
        .with_meta("account_age_days", age)
        .with_meta("amount", amount),
    ))
}

fn brand_new_account(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::ACCOUNT_AGE_DAYS)? {
        Some(age) if age < 1.0 => Ok(Some(RuleHit::new(
            0.6,
            format!("Account created {:.1} hours ago", age * 24.0),
        ))),
        _ => Ok(None),
    }
}

fn recent_password_reset(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::PASSWORD_RESET_HOURS)? {
        Some(hours) if (0.0..24.0).contains(&hours) => Ok(Some(
            RuleHit::new(0.65, format!("Password reset {:.1} hours ago", hours))
                .with_meta("password_reset_hours", hours),
        )),
        _ => Ok(None),
    }
}

fn profile_change_before_payout(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(hours), Some(amount)) = (ctx.num(fields::PROFILE_CHANGED_HOURS)?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if !(0.0..48.0).contains(&hours) || amount < 1_000.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.6, format!("Profile changed {:.1} hours before moving {:.2}", hours, amount))
            .with_meta("profile_changed_hours", hours),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_large_amount() {
        let ctx = TransactionContext::builder()
            .set(fields::ACCOUNT_AGE_DAYS, 2.0)
            .set(fields::AMOUNT, 500_000.0)
            .build();
        assert!(new_account_large_amount(&ctx).unwrap().is_some());

        let old = TransactionContext::builder()
            .set(fields::ACCOUNT_AGE_DAYS, 7.0)
            .set(fields::AMOUNT, 500_000.0)
            .build();
        assert!(new_account_large_amount(&old).unwrap().is_none());
    }

    #[test]
    fn test_unknown_age_never_triggers() {
        let ctx = TransactionContext::builder().set(fields::AMOUNT, 500_000.0).build();
        assert!(new_account_large_amount(&ctx).unwrap().is_none());
        assert!(brand_new_account(&ctx).unwrap().is_none());
    }
}
