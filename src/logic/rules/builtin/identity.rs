//! Identity, email and consortium rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::scaled_confidence;

const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "trashmail.com",
    "sharklasers.com",
    "getnada.com",
    "dispostable.com",
];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("IDENTITY_UNVERIFIED", "Identity Verification Failed", RuleCategory::Identity, Severity::Medium, 20)
                .describe("Identity provider explicitly reports the user as unverified"),
            identity_unverified,
        ),
        Rule::native(
            RuleMeta::new("IDENTITY_LOW_MATCH", "Weak Identity Match", RuleCategory::Identity, Severity::High, 25)
                .describe("Identity match score below 0.5"),
            identity_low_match,
        ),
        Rule::native(
            RuleMeta::new("DISPOSABLE_EMAIL", "Disposable Email Domain", RuleCategory::Identity, Severity::Medium, 20)
                .describe("Email on a known disposable-mailbox domain"),
            disposable_email,
        ),
        Rule::native(
            RuleMeta::new("NUMERIC_EMAIL", "Machine-Generated Email", RuleCategory::Identity, Severity::Low, 10)
                .describe("Half or more of the email local part is digits"),
            numeric_email,
        ),
        Rule::native(
            RuleMeta::new("CONSORTIUM_FRAUD_REPORTS", "Reported By Other Institutions", RuleCategory::Consortium, Severity::Critical, 40)
                .describe("Identity has confirmed fraud reports in the consortium"),
            consortium_fraud_reports,
        ),
        Rule::native(
            RuleMeta::new("CONSORTIUM_MULTI_CLIENT", "Identity Active At Many Institutions", RuleCategory::Consortium, Severity::Medium, 15)
                .describe("Identity seen at 5 or more consortium members")
                .for_verticals(&["lending", "fintech"]),
            consortium_multi_client,
        ),
    ]
}

fn identity_unverified(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    // absent means "not checked", only an explicit false counts
    match ctx.flag(fields::IDENTITY_VERIFIED)? {
        Some(false) => Ok(Some(RuleHit::new(0.7, "Identity verification failed"))),
        _ => Ok(None),
    }
}

fn identity_low_match(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::IDENTITY_MATCH_SCORE)? {
        Some(score) if !(0.0..=1.0).contains(&score) => Err(RuleError::InvalidValue {
            field: fields::IDENTITY_MATCH_SCORE.to_string(),
            reason: format!("{} outside [0, 1]", score),
        }),
        Some(score) if score < 0.5 => Ok(Some(
            RuleHit::new(1.0 - score, format!("Identity match score {:.2}", score))
                .with_meta("identity_match_score", score),
        )),
        _ => Ok(None),
    }
}

fn disposable_email(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let Some(domain) = ctx.text(fields::EMAIL_DOMAIN)? else {
        return Ok(None);
    };
    if !DISPOSABLE_DOMAINS.contains(&domain) {
        return Ok(None);
    }
    Ok(Some(
        RuleHit::new(0.8, format!("Disposable email domain {}", domain)).with_meta("email_domain", domain),
    ))
}

fn numeric_email(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::EMAIL_LOCAL_DIGITS_RATIO)? {
        Some(ratio) if ratio >= 0.5 => Ok(Some(RuleHit::new(
            0.4 + 0.4 * ratio,
            format!("{:.0}% of email local part is digits", ratio * 100.0),
        ))),
        _ => Ok(None),
    }
}

fn consortium_fraud_reports(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::CONSORTIUM_FRAUD_REPORTS)? {
        Some(reports) if reports >= 1.0 => Ok(Some(
            RuleHit::new(
                scaled_confidence(reports, 1.0, 5.0, 0.8),
                format!("{} fraud report(s) from consortium members", reports),
            )
            .with_meta("consortium_fraud_reports", reports),
        )),
        _ => Ok(None),
    }
}

fn consortium_multi_client(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::CONSORTIUM_CLIENT_COUNT)? {
        Some(clients) if clients >= 5.0 => Ok(Some(RuleHit::new(
            scaled_confidence(clients, 5.0, 15.0, 0.5),
            format!("Identity active at {} institutions", clients),
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unverified_requires_explicit_false() {
        let absent = TransactionContext::builder().build();
        assert!(identity_unverified(&absent).unwrap().is_none());

        let failed = TransactionContext::builder().set(fields::IDENTITY_VERIFIED, false).build();
        assert!(identity_unverified(&failed).unwrap().is_some());
    }

    #[test]
    fn test_match_score_out_of_range_is_error() {
        let ctx = TransactionContext::builder().set(fields::IDENTITY_MATCH_SCORE, 7.0).build();
        assert!(matches!(identity_low_match(&ctx), Err(RuleError::InvalidValue { .. })));
    }

    #[test]
    fn test_disposable_email() {
        let ctx = TransactionContext::builder().set(fields::EMAIL_DOMAIN, "yopmail.com").build();
        assert!(disposable_email(&ctx).unwrap().is_some());
    }
}
