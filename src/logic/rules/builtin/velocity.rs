//! Velocity rules
//!
//! All counts here exclude the transaction being scored.

use crate::error::RuleError;
use crate::logic::context::TransactionContext;
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::scaled_confidence;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("HIGH_VELOCITY", "High Transaction Velocity", RuleCategory::Velocity, Severity::High, 30)
                .describe("5 or more transactions by the same user in the last hour"),
            high_velocity,
        ),
        Rule::native(
            RuleMeta::new("DAILY_VELOCITY_SPIKE", "Daily Velocity Spike", RuleCategory::Velocity, Severity::Medium, 20)
                .describe("20 or more transactions by the same user in 24 hours"),
            daily_velocity_spike,
        ),
        Rule::native(
            RuleMeta::new("AMOUNT_VELOCITY_24H", "High Spend Velocity", RuleCategory::Velocity, Severity::Medium, 20)
                .describe("At least 10,000 moved across 3+ transactions in 24 hours"),
            amount_velocity_24h,
        ),
        Rule::native(
            RuleMeta::new("DEVICE_MULTI_ACCOUNT", "Device Shared Across Accounts", RuleCategory::Velocity, Severity::High, 30)
                .describe("Device used by 3 or more distinct users in 24 hours"),
            device_multi_account,
        ),
        Rule::native(
            RuleMeta::new("IP_MULTI_ACCOUNT", "IP Shared Across Accounts", RuleCategory::Velocity, Severity::High, 25)
                .describe("IP address used by 5 or more distinct users in the last hour"),
            ip_multi_account,
        ),
        Rule::native(
            RuleMeta::new("USER_MULTI_DEVICE", "User On Many Devices", RuleCategory::Velocity, Severity::Medium, 15)
                .describe("User seen on 4 or more devices in 24 hours"),
            user_multi_device,
        ),
        Rule::native(
            RuleMeta::new("DEVICE_VELOCITY_1H", "Device Burst", RuleCategory::Velocity, Severity::Medium, 20)
                .describe("10 or more transactions from one device in the last hour"),
            device_velocity_1h,
        ),
    ]
}

fn high_velocity(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let count = ctx.count("user_count_1h")?;
    if count < 5.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(count, 5.0, 15.0, 0.7),
            format!("{} transactions in the last hour", count),
        )
        .with_meta("user_count_1h", count),
    ))
}

fn daily_velocity_spike(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let count = ctx.count("user_count_24h")?;
    if count < 20.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(count, 20.0, 60.0, 0.6),
            format!("{} transactions in 24 hours", count),
        )
        .with_meta("user_count_24h", count),
    ))
}

fn amount_velocity_24h(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let count = ctx.count("user_count_24h")?;
    let sum = ctx.count("user_sum_24h")?;
    if count < 3.0 || sum < 10_000.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(sum, 10_000.0, 50_000.0, 0.6),
            format!("{:.2} moved across {} transactions in 24 hours", sum, count),
        )
        .with_meta("user_sum_24h", sum)
        .with_meta("user_count_24h", count),
    ))
}

fn device_multi_account(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(users) = ctx.num("device_distinct_24h")? else {
        return Ok(None);
    };
    if users < 3.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(users, 3.0, 10.0, 0.75),
            format!("Device used by {} accounts in 24 hours", users),
        )
        .with_meta("device_distinct_24h", users),
    ))
}

fn ip_multi_account(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(users) = ctx.num("ip_distinct_1h")? else {
        return Ok(None);
    };
    if users < 5.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(users, 5.0, 20.0, 0.6),
            format!("IP used by {} accounts in the last hour", users),
        )
        .with_meta("ip_distinct_1h", users),
    ))
}

fn user_multi_device(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let devices = ctx.count("user_distinct_24h")?;
    if devices < 4.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.6, format!("User seen on {} devices in 24 hours", devices))
            .with_meta("user_distinct_24h", devices),
    ))
}

fn device_velocity_1h(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(count) = ctx.num("device_count_1h")? else {
        return Ok(None);
    };
    if count < 10.0 {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(
            scaled_confidence(count, 10.0, 30.0, 0.6),
            format!("{} transactions from this device in the last hour", count),
        )
        .with_meta("device_count_1h", count),
    ))
}
