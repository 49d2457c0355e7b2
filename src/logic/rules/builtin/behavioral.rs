//! Session and timing rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("NIGHT_TIME_ACTIVITY", "Unusual Hour", RuleCategory::Behavioral, Severity::Low, 10)
                .describe("500+ transaction between 00:00 and 05:00 local time"),
            night_time_activity,
        ),
        Rule::native(
            RuleMeta::new("SHORT_SESSION_HIGH_VALUE", "Scripted Session", RuleCategory::Behavioral, Severity::Medium, 15)
                .describe("Session shorter than 30 seconds ending in a 1,000+ transaction"),
            short_session_high_value,
        ),
    ]
}

fn night_time_activity(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(hour), Some(amount)) = (ctx.num(fields::HOUR_OF_DAY)?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if hour >= 5.0 || amount < 500.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.4, format!("{:.2} at {:02}:00 local time", amount, hour as u32))
            .with_meta("hour_of_day", hour),
    ))
}

fn short_session_high_value(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(secs), Some(amount)) = (ctx.num(fields::SESSION_DURATION_SECS)?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if secs >= 30.0 || amount < 1_000.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.6, format!("{:.2} moved {:.0}s into the session", amount, secs))
            .with_meta("session_duration_secs", secs),
    ))
}
