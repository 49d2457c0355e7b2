//! Gaming and betting rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("BONUS_ABUSE", "Multi-Account Bonus Abuse", RuleCategory::Gaming, Severity::High, 25)
                .describe("Bonus claimed from a device shared by 2+ accounts in 30 days")
                .for_verticals(&["gaming"]),
            bonus_abuse,
        ),
        Rule::native(
            RuleMeta::new("LOW_WAGER_WITHDRAWAL", "Withdrawal Without Play", RuleCategory::Gaming, Severity::Medium, 20)
                .describe("Withdrawal after wagering less than the deposited amount")
                .for_verticals(&["gaming"]),
            low_wager_withdrawal,
        ),
    ]
}

fn bonus_abuse(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    if !ctx.is_true(fields::BONUS_CLAIMED)? {
        return Ok(None);
    }
    match ctx.num("device_distinct_30d")? {
        Some(accounts) if accounts >= 2.0 => Ok(Some(
            RuleHit::new(0.75, format!("Bonus claimed on a device shared by {} accounts", accounts))
                .with_meta("device_distinct_30d", accounts),
        )),
        _ => Ok(None),
    }
}

fn low_wager_withdrawal(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let is_withdrawal = ctx
        .text(fields::TRANSACTION_TYPE)?
        .map_or(false, |t| t.eq_ignore_ascii_case("withdrawal"));
    if !is_withdrawal {
        return Ok(None);
    }
    match ctx.num(fields::WAGERED_RATIO)? {
        Some(ratio) if ratio < 1.0 => Ok(Some(RuleHit::new(
            0.6,
            format!("Withdrawal after wagering {:.0}% of deposits", ratio * 100.0),
        ))),
        _ => Ok(None),
    }
}
