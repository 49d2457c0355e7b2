//! Crypto exchange rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("NEW_WALLET_WITHDRAWAL", "Withdrawal To New Wallet", RuleCategory::Crypto, Severity::High, 30)
                .describe("Withdrawal to a destination wallet younger than one day")
                .for_verticals(&["crypto"]),
            new_wallet_withdrawal,
        ),
        Rule::native(
            RuleMeta::new("MIXER_DESTINATION", "Mixer Destination", RuleCategory::Crypto, Severity::Critical, 45)
                .describe("Destination wallet is attributed to a mixing service")
                .for_verticals(&["crypto"]),
            mixer_destination,
        ),
        Rule::native(
            RuleMeta::new("RAPID_DEPOSIT_WITHDRAWAL", "Rapid Deposit-Withdrawal", RuleCategory::Crypto, Severity::High, 25)
                .describe("Withdrawal within 30 minutes of the last deposit")
                .for_verticals(&["crypto"]),
            rapid_deposit_withdrawal,
        ),
    ]
}

fn is_withdrawal(ctx: &TransactionContext) -> Result<bool, RuleError> {
    Ok(ctx
        .text(fields::TRANSACTION_TYPE)?
        .map_or(false, |t| t.eq_ignore_ascii_case("withdrawal")))
}

fn new_wallet_withdrawal(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    if !is_withdrawal(ctx)? {
        return Ok(None);
    }
    match ctx.num(fields::DESTINATION_WALLET_AGE_DAYS)? {
        Some(age) if age < 1.0 => Ok(Some(
            RuleHit::new(0.75, format!("Destination wallet is {:.1} hours old", age * 24.0))
                .with_meta("destination_wallet_age_days", age),
        )),
        _ => Ok(None),
    }
}

fn mixer_destination(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(ctx
        .is_true(fields::DESTINATION_WALLET_MIXER)?
        .then(|| RuleHit::new(0.95, "Funds sent to a mixing service")))
}

fn rapid_deposit_withdrawal(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    if !is_withdrawal(ctx)? {
        return Ok(None);
    }
    match ctx.num(fields::MINUTES_SINCE_LAST_DEPOSIT)? {
        Some(minutes) if (0.0..30.0).contains(&minutes) => Ok(Some(
            RuleHit::new(0.7, format!("Withdrawal {:.0} minutes after deposit", minutes))
                .with_meta("minutes_since_last_deposit", minutes),
        )),
        _ => Ok(None),
    }
}
