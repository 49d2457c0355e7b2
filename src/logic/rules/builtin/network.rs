//! Network and geolocation rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("TOR_EXIT_NODE", "Tor Exit Node", RuleCategory::Network, Severity::High, 30)
                .describe("Transaction originates from a Tor exit node"),
            tor_exit_node,
        ),
        Rule::native(
            RuleMeta::new("PROXY_OR_VPN", "Proxy or VPN", RuleCategory::Network, Severity::Medium, 15)
                .describe("IP reputation reports an anonymising proxy or VPN"),
            proxy_or_vpn,
        ),
        Rule::native(
            RuleMeta::new("GEO_MISMATCH", "Country Mismatch", RuleCategory::Network, Severity::Medium, 15)
                .describe("Account country differs from IP geolocation country"),
            geo_mismatch,
        ),
        Rule::native(
            RuleMeta::new("HIGH_RISK_IP", "High Risk IP", RuleCategory::Network, Severity::High, 25)
                .describe("IP reputation score of 80 or more"),
            high_risk_ip,
        ),
    ]
}

fn tor_exit_node(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(ctx
        .is_true(fields::IP_TOR)?
        .then(|| RuleHit::new(0.9, "Transaction routed through Tor")))
}

fn proxy_or_vpn(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    Ok(ctx
        .is_true(fields::IP_PROXY)?
        .then(|| RuleHit::new(0.6, "Transaction routed through a proxy or VPN")))
}

fn geo_mismatch(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    if !ctx.is_true(fields::GEO_MISMATCH)? {
        return Ok(None);
    }
    let country = ctx.text(fields::COUNTRY)?.unwrap_or("?");
    let ip_country = ctx.text(fields::IP_COUNTRY)?.unwrap_or("?");
    Ok(Some(
        RuleHit::new(0.6, format!("Account country {} but IP in {}", country, ip_country))
            .with_meta("country", country)
            .with_meta("ip_country", ip_country),
    ))
}

fn high_risk_ip(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::IP_RISK_SCORE)? {
        Some(score) if score >= 80.0 => Ok(Some(RuleHit::new(
            0.75,
            format!("IP risk score {:.0}", score),
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_mismatch_message() {
        let ctx = TransactionContext::builder()
            .set(fields::GEO_MISMATCH, true)
            .set(fields::COUNTRY, "US")
            .set(fields::IP_COUNTRY, "NG")
            .build();
        let hit = geo_mismatch(&ctx).unwrap().unwrap();
        assert_eq!(hit.message, "Account country US but IP in NG");
    }

    #[test]
    fn test_mistyped_signal_is_error() {
        let ctx = TransactionContext::builder().set(fields::IP_TOR, "yes").build();
        assert!(tor_exit_node(&ctx).is_err());
    }
}
