//! E-commerce and payments rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("SHIPPING_BILLING_MISMATCH", "Shipping/Billing Country Mismatch", RuleCategory::Commerce, Severity::Medium, 15)
                .describe("Order ships to a different country than the billing address")
                .for_verticals(&["ecommerce"]),
            shipping_billing_mismatch,
        ),
        Rule::native(
            RuleMeta::new("CARD_COUNTRY_MISMATCH", "Card Issued Abroad", RuleCategory::Commerce, Severity::Medium, 15)
                .describe("Card issuing country differs from IP country")
                .for_verticals(&["ecommerce", "fintech"]),
            card_country_mismatch,
        ),
        Rule::native(
            RuleMeta::new("GIFT_CARD_BULK", "Bulk Gift Card Purchase", RuleCategory::Commerce, Severity::High, 25)
                .describe("5 or more gift cards in one order")
                .for_verticals(&["ecommerce"]),
            gift_card_bulk,
        ),
        Rule::native(
            RuleMeta::new("NEW_PAYEE_LARGE_TRANSFER", "Large Transfer To New Payee", RuleCategory::Commerce, Severity::High, 25)
                .describe("5,000+ sent to a payee seen for the first time")
                .for_verticals(&["fintech"]),
            new_payee_large_transfer,
        ),
    ]
}

fn country_pair(ctx: &TransactionContext, a: &str, b: &str) -> Result<Option<(String, String)>, RuleError> {
    match (ctx.text(a)?, ctx.text(b)?) {
        (Some(x), Some(y)) if !x.eq_ignore_ascii_case(y) => Ok(Some((x.to_string(), y.to_string()))),
        _ => Ok(None),
    }
}

fn shipping_billing_mismatch(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(country_pair(ctx, fields::SHIPPING_COUNTRY, fields::BILLING_COUNTRY)?.map(|(ship, bill)| {
        RuleHit::new(0.55, format!("Ships to {} but bills to {}", ship, bill))
    }))
}

fn card_country_mismatch(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(country_pair(ctx, fields::CARD_COUNTRY, fields::IP_COUNTRY)?.map(|(card, ip)| {
        RuleHit::new(0.5, format!("Card issued in {} used from {}", card, ip))
    }))
}

fn gift_card_bulk(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::GIFT_CARD_COUNT)? {
        Some(count) if count >= 5.0 => Ok(Some(
            RuleHit::new(0.7, format!("{} gift cards in one order", count))
                .with_meta("gift_card_count", count),
        )),
        _ => Ok(None),
    }
}

fn new_payee_large_transfer(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    if !ctx.is_true(fields::PAYEE_FIRST_SEEN)? {
        return Ok(None);
    }
    match ctx.num(fields::AMOUNT)? {
        Some(amount) if amount >= 5_000.0 => Ok(Some(RuleHit::new(
            0.65,
            format!("{:.2} to a first-time payee", amount),
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_match_is_case_insensitive() {
        let ctx = TransactionContext::builder()
            .set(fields::SHIPPING_COUNTRY, "de")
            .set(fields::BILLING_COUNTRY, "DE")
            .build();
        assert!(shipping_billing_mismatch(&ctx).unwrap().is_none());
    }
}
