//! Context Field Names
//!
//! **This file is the field vocabulary shared by the builder, the rules and the
//! model feature layout.** Renaming a field here renames it everywhere.

use crate::logic::velocity::{SubjectKind, VelocityMetric, Window};

// ============================================================================
// RAW TRANSACTION FIELDS
// ============================================================================

pub const TRANSACTION_ID: &str = "transaction_id";
pub const USER_ID: &str = "user_id";
pub const VERTICAL: &str = "vertical";
pub const AMOUNT: &str = "amount";
pub const CURRENCY: &str = "currency";
pub const TRANSACTION_TYPE: &str = "transaction_type";
pub const TIMESTAMP: &str = "timestamp";
pub const DEVICE_ID: &str = "device_id";
pub const IP_ADDRESS: &str = "ip_address";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const COUNTRY: &str = "country";
pub const IP_COUNTRY: &str = "ip_country";
pub const ACCOUNT_CREATED_AT: &str = "account_created_at";

// ============================================================================
// DERIVED FIELDS
// ============================================================================

pub const ACCOUNT_AGE_DAYS: &str = "account_age_days";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const EMAIL_DOMAIN: &str = "email_domain";
pub const EMAIL_LOCAL_DIGITS_RATIO: &str = "email_local_digits_ratio";
pub const GEO_MISMATCH: &str = "geo_mismatch";
pub const USER_AVG_AMOUNT_30D: &str = "user_avg_amount_30d";

// ============================================================================
// EXTERNAL SIGNALS
// ============================================================================

pub const DEVICE_RISK_SCORE: &str = "device_risk_score";
pub const DEVICE_EMULATOR: &str = "device_emulator";
pub const DEVICE_ROOTED: &str = "device_rooted";

pub const IP_PROXY: &str = "ip_proxy";
pub const IP_TOR: &str = "ip_tor";
pub const IP_RISK_SCORE: &str = "ip_risk_score";

pub const IDENTITY_VERIFIED: &str = "identity_verified";
pub const IDENTITY_MATCH_SCORE: &str = "identity_match_score";

pub const CONSORTIUM_FRAUD_REPORTS: &str = "consortium_fraud_reports";
pub const CONSORTIUM_CLIENT_COUNT: &str = "consortium_client_count";

// ============================================================================
// ATTRIBUTES (flattened from Transaction.attributes)
// ============================================================================

pub const TIMEZONE_OFFSET_MINUTES: &str = "timezone_offset_minutes";
pub const SESSION_DURATION_SECS: &str = "session_duration_secs";
pub const PROFILE_CHANGED_HOURS: &str = "profile_changed_hours";
pub const PASSWORD_RESET_HOURS: &str = "password_reset_hours";

// lending
pub const STATED_ANNUAL_INCOME: &str = "stated_annual_income";
pub const EMPLOYMENT_STATUS: &str = "employment_status";
pub const OPEN_LOAN_APPLICATIONS_30D: &str = "open_loan_applications_30d";

// crypto
pub const DESTINATION_WALLET_AGE_DAYS: &str = "destination_wallet_age_days";
pub const DESTINATION_WALLET_MIXER: &str = "destination_wallet_mixer";
pub const MINUTES_SINCE_LAST_DEPOSIT: &str = "minutes_since_last_deposit";

// ecommerce / payments
pub const SHIPPING_COUNTRY: &str = "shipping_country";
pub const BILLING_COUNTRY: &str = "billing_country";
pub const CARD_COUNTRY: &str = "card_country";
pub const GIFT_CARD_COUNT: &str = "gift_card_count";
pub const PAYEE_FIRST_SEEN: &str = "payee_first_seen";

// gaming
pub const BONUS_CLAIMED: &str = "bonus_claimed";
pub const WAGERED_RATIO: &str = "wagered_ratio";

// ============================================================================
// VELOCITY FIELDS
// ============================================================================

/// `<subject>_<metric>_<window>`, e.g. `user_count_1h`, `ip_distinct_24h`
pub fn velocity(kind: SubjectKind, metric: VelocityMetric, window: Window) -> String {
    format!("{}_{}_{}", kind.as_str(), metric.as_str(), window.as_str())
}
