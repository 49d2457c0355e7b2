//! Lending rules

use crate::error::RuleError;
use crate::logic::context::{fields, TransactionContext};
use crate::logic::rules::types::{Rule, RuleCategory, RuleHit, RuleMeta, Severity};

use super::scaled_confidence;

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::native(
            RuleMeta::new("LOAN_INCOME_MISMATCH", "Loan Exceeds Stated Income", RuleCategory::Lending, Severity::High, 25)
                .describe("Requested amount above half of stated annual income")
                .for_verticals(&["lending"]),
            loan_income_mismatch,
        ),
        Rule::native(
            RuleMeta::new("LOAN_STACKING", "Loan Stacking", RuleCategory::Lending, Severity::High, 30)
                .describe("3 or more open loan applications in 30 days")
                .for_verticals(&["lending"]),
            loan_stacking,
        ),
        Rule::native(
            RuleMeta::new("UNEMPLOYED_LARGE_LOAN", "Large Loan Without Employment", RuleCategory::Lending, Severity::Medium, 20)
                .describe("Applicant reports no employment and requests 5,000+")
                .for_verticals(&["lending"]),
            unemployed_large_loan,
        ),
    ]
}

fn loan_income_mismatch(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(amount), Some(income)) = (ctx.num(fields::AMOUNT)?, ctx.num(fields::STATED_ANNUAL_INCOME)?) else {
        return Ok(None);
    };
    if income < 0.0 {
        return Err(RuleError::InvalidValue {
            field: fields::STATED_ANNUAL_INCOME.to_string(),
            reason: "negative income".to_string(),
        });
    }
    if amount <= income * 0.5 {
        return Ok(None);
    }
    let ratio = if income > 0.0 { amount / income } else { f64::INFINITY };
    Ok(Some(
        RuleHit::new(
            scaled_confidence(ratio.min(10.0), 0.5, 3.0, 0.6),
            format!("Requested {:.2} against stated income {:.2}", amount, income),
        )
        .with_meta("stated_annual_income", income),
    ))
}

fn loan_stacking(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    match ctx.num(fields::OPEN_LOAN_APPLICATIONS_30D)? {
        Some(open) if open >= 3.0 => Ok(Some(
            RuleHit::new(
                scaled_confidence(open, 3.0, 8.0, 0.7),
                format!("{} open loan applications in 30 days", open),
            )
            .with_meta("open_loan_applications_30d", open),
        )),
        _ => Ok(None),
    }
}

fn unemployed_large_loan(ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
    let (Some(status), Some(amount)) = (ctx.text(fields::EMPLOYMENT_STATUS)?, ctx.num(fields::AMOUNT)?) else {
        return Ok(None);
    };
    if !status.eq_ignore_ascii_case("unemployed") || amount < 5_000.0 {
        return Ok(None);
    }
    Ok(Some(RuleHit::new(
        0.55,
        format!("Unemployed applicant requesting {:.2}", amount),
    )))
}
