//! Amount rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::scaled_confidence;

/// Amounts at or above this are "large" across verticals
pub const LARGE_AMOUNT: f64 = 10_000.0;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("LARGE_AMOUNT", "Large Transaction Amount", RuleCategory::Amount, Severity::Medium, 15)
                .describe("Amount of 10,000 or more"),
            large_amount,
        ),
        Rule::native(
            RuleMeta::new("AMOUNT_SPIKE_VS_AVERAGE", "Amount Far Above User Average", RuleCategory::Amount, Severity::High, 25)
                .describe("Amount at least 5x the user's 30-day average, with 3+ prior transactions"),
            amount_spike_vs_average,
        ),
        Rule::native(
            RuleMeta::new("ROUND_AMOUNT", "Round Amount", RuleCategory::Amount, Severity::Low, 5)
                .describe("Amount of 1,000 or more that is an exact multiple of 1,000"),
            round_amount,
        ),
        Rule::native(
            RuleMeta::new("MICRO_TRANSACTION_PROBING", "Card Testing Pattern", RuleCategory::Amount, Severity::Medium, 20)
                .describe("Amount under 2 after 3+ transactions in the last hour"),
            micro_transaction_probing,
        ),
        Rule::native(
            RuleMeta::new("JUST_BELOW_REPORTING_THRESHOLD", "Structuring Below Threshold", RuleCategory::Amount, Severity::Medium, 15)
                .describe("Amount between 9,000 and 10,000 (exclusive)")
                .for_verticals(&["crypto", "fintech", "lending"]),
            just_below_reporting_threshold,
        ),
    ]
}

fn amount(ctx: &TransactionContext) -> Result<Option<f64>, RuleError> {
    ctx.num(fields::AMOUNT)
}

fn large_amount(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(amount) = amount(ctx)? else {
        return Ok(None);
    };
    if amount < LARGE_AMOUNT {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(amount, LARGE_AMOUNT, 100_000.0, 0.5),
            format!("Amount {:.2} at or above {:.0}", amount, LARGE_AMOUNT),
        )
        .with_meta("amount", amount),
    ))
}

fn amount_spike_vs_average(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(amount), Some(avg)) = (amount(ctx)?, ctx.num(fields::USER_AVG_AMOUNT_30D)?) else {
        return Ok(None);
    };
    if ctx.count("user_count_30d")? < 3.0 || avg <= 0.0 {
        return Ok(None);
    }
    let ratio = amount / avg;
    if ratio < 5.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(ratio, 5.0, 20.0, 0.6),
            format!("Amount is {:.1}x the 30-day average of {:.2}", ratio, avg),
        )
        .with_meta("ratio", ratio)
        .with_meta("user_avg_amount_30d", avg),
    ))
}

fn round_amount(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(amount) = amount(ctx)? else {
        return Ok(None);
    };
    if amount < 1_000.0 || amount % 1_000.0 != 0.0 {
        return Ok(None);
    }
    Ok(Some(RuleHit::new(0.4, format!("Round amount {:.0}", amount))))
}

fn micro_transaction_probing(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(amount) = amount(ctx)? else {
        return Ok(None);
    };
    let recent = ctx.count("user_count_1h")?;
    if amount >= 2.0 || recent < 3.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.7, format!("Micro amount {:.2} after {} recent attempts", amount, recent))
            .with_meta("user_count_1h", recent),
    ))
}

fn just_below_reporting_threshold(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(amount) = amount(ctx)? else {
        return Ok(None);
    };
    if !(9_000.0..LARGE_AMOUNT).contains(&amount) {
        return Ok(None);
    }
    Ok(Some(RuleHit::new(
        0.5,
        format!("Amount {:.2} just below the {:.0} reporting threshold", amount, LARGE_AMOUNT),
    )))
}
