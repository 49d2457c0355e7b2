//! Feature Context Builder
//!
//! Assembles the flat context for one transaction:
//! raw fields → derived fields → velocity aggregates → external signals → attributes.
//! Earlier stages win on a name collision.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Timelike};
use tokio::time::Instant;

use crate::error::RiskError;
use crate::logic::scoring::Degradation;
use crate::logic::signals::{collect_signals, CollectedSignals, SignalProvider};
use crate::logic::velocity::{
    aggregates_with_retry, RetryPolicy, Subject, SubjectAggregates, SubjectKind, VelocityMetric,
    VelocityStore, Window,
};

use super::fields;
use super::transaction::Transaction;
use super::types::{ContextFields, FieldValue, TransactionContext};

/// Context plus whatever went missing while building it
#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub context: TransactionContext,
    pub degradations: Vec<Degradation>,
}

pub struct FeatureContextBuilder {
    velocity: Arc<dyn VelocityStore>,
    providers: Vec<Arc<dyn SignalProvider>>,
    retry: RetryPolicy,
    signal_timeout: Duration,
}

impl FeatureContextBuilder {
    pub fn new(velocity: Arc<dyn VelocityStore>) -> Self {
        Self {
            velocity,
            providers: Vec::new(),
            retry: RetryPolicy::default(),
            signal_timeout: Duration::from_millis(crate::constants::DEFAULT_SIGNAL_TIMEOUT_MS),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn SignalProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_signal_timeout(mut self, timeout: Duration) -> Self {
        self.signal_timeout = timeout;
        self
    }

    pub fn velocity_store(&self) -> &Arc<dyn VelocityStore> {
        &self.velocity
    }

    /// Build the context. Fails only when velocity cannot be read.
    pub async fn build(&self, tx: &Transaction, deadline: Instant) -> Result<BuiltContext, RiskError> {
        let mut degradations = Vec::new();

        let remaining = deadline.saturating_duration_since(Instant::now());
        let signal_budget = self.signal_timeout.min(remaining);
        let skip_signals = !self.providers.is_empty() && signal_budget.is_zero();

        let (velocity, signals) = tokio::join!(self.read_velocity(tx), async {
            if skip_signals || self.providers.is_empty() {
                CollectedSignals::default()
            } else {
                collect_signals(&self.providers, tx, signal_budget).await
            }
        });
        let velocity = velocity?;

        if skip_signals {
            degradations.push(Degradation::DeadlineExceeded {
                stage: "signals".to_string(),
            });
        }
        for provider in &signals.unavailable {
            degradations.push(Degradation::SignalUnavailable {
                provider: provider.clone(),
            });
        }

        let mut ctx = raw_fields(tx);
        derive_fields(&mut ctx, tx);
        velocity_fields(&mut ctx, &velocity);

        for (name, value) in signals.fields {
            if !ctx.insert_new(name.clone(), value) {
                tracing::debug!(field = %name, "Signal field shadowed by core field");
            }
        }

        for (name, json) in &tx.attributes {
            let Some(value) = FieldValue::from_json(json) else {
                tracing::debug!(field = %name, "Ignoring non-scalar attribute");
                continue;
            };
            if !ctx.insert_new(name.clone(), value) {
                tracing::debug!(field = %name, "Attribute shadowed by core field");
            }
        }

        Ok(BuiltContext {
            context: ctx.build(),
            degradations,
        })
    }

    async fn read_velocity(&self, tx: &Transaction) -> Result<Vec<(SubjectKind, SubjectAggregates)>, RiskError> {
        let store = self.velocity.as_ref();
        let as_of = tx.timestamp;

        let user = Subject::user(&tx.user_id);
        let device = tx.device_id.as_deref().map(Subject::device);
        let network = tx.ip_address.as_deref().map(Subject::network);

        let (user_aggs, device_aggs, network_aggs) = tokio::try_join!(
            aggregates_with_retry(store, &user, as_of, self.retry),
            async {
                match &device {
                    Some(s) => aggregates_with_retry(store, s, as_of, self.retry).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                match &network {
                    Some(s) => aggregates_with_retry(store, s, as_of, self.retry).await.map(Some),
                    None => Ok(None),
                }
            },
        )?;

        let mut out = vec![(SubjectKind::User, user_aggs)];
        if let Some(aggs) = device_aggs {
            out.push((SubjectKind::Device, aggs));
        }
        if let Some(aggs) = network_aggs {
            out.push((SubjectKind::Network, aggs));
        }
        Ok(out)
    }
}

// ============================================================================
// FIELD STAGES
// ============================================================================

fn raw_fields(tx: &Transaction) -> ContextFields {
    let amount = if tx.amount.is_finite() { Some(tx.amount) } else { None };

    TransactionContext::builder()
        .set(fields::TRANSACTION_ID, tx.transaction_id.as_str())
        .set(fields::USER_ID, tx.user_id.as_str())
        .set(fields::VERTICAL, tx.vertical.as_str())
        .set_opt(fields::AMOUNT, amount)
        .set(fields::CURRENCY, tx.currency.as_str())
        .set(fields::TRANSACTION_TYPE, tx.transaction_type.as_str())
        .set(fields::TIMESTAMP, tx.timestamp)
        .set_opt(fields::DEVICE_ID, tx.device_id.as_deref())
        .set_opt(fields::IP_ADDRESS, tx.ip_address.as_deref())
        .set_opt(fields::EMAIL, tx.email.as_deref())
        .set_opt(fields::PHONE, tx.phone.as_deref())
        .set_opt(fields::COUNTRY, tx.country.as_deref())
        .set_opt(fields::IP_COUNTRY, tx.ip_country.as_deref())
        .set_opt(fields::ACCOUNT_CREATED_AT, tx.account_created_at)
}

fn derive_fields(ctx: &mut ContextFields, tx: &Transaction) {
    if let Some(created) = tx.account_created_at {
        let age_days = (tx.timestamp - created).num_seconds() as f64 / 86_400.0;
        ctx.insert(fields::ACCOUNT_AGE_DAYS, age_days.max(0.0));
    }

    let offset_minutes = tx
        .attributes
        .get(fields::TIMEZONE_OFFSET_MINUTES)
        .and_then(|v| v.as_i64())
        .filter(|m| m.abs() <= 14 * 60)
        .unwrap_or(0);
    let local = tx.timestamp + ChronoDuration::minutes(offset_minutes);
    ctx.insert(fields::HOUR_OF_DAY, local.hour() as f64);

    if let Some((local_part, domain)) = tx.email.as_deref().and_then(|e| e.rsplit_once('@')) {
        if !local_part.is_empty() && !domain.is_empty() {
            ctx.insert(fields::EMAIL_DOMAIN, domain.to_ascii_lowercase());
            let digits = local_part.chars().filter(|c| c.is_ascii_digit()).count();
            let ratio = digits as f64 / local_part.chars().count() as f64;
            ctx.insert(fields::EMAIL_LOCAL_DIGITS_RATIO, ratio);
        }
    }

    if let (Some(country), Some(ip_country)) = (&tx.country, &tx.ip_country) {
        ctx.insert(fields::GEO_MISMATCH, !country.eq_ignore_ascii_case(ip_country));
    }
}

fn velocity_fields(ctx: &mut ContextFields, velocity: &[(SubjectKind, SubjectAggregates)]) {
    const METRICS: [VelocityMetric; 3] =
        [VelocityMetric::Count, VelocityMetric::Sum, VelocityMetric::Distinct];

    for (kind, aggs) in velocity {
        for window in Window::ALL {
            let agg = aggs.window(window);
            for metric in METRICS {
                ctx.insert(fields::velocity(*kind, metric, window), agg.get(metric));
            }
        }

        if *kind == SubjectKind::User {
            if let Some(avg) = aggs.thirty_days.average() {
                ctx.insert(fields::USER_AVG_AMOUNT_30D, avg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::signals::{SignalKind, StaticSignalProvider, SignalValues};
    use crate::logic::velocity::InMemoryVelocityStore;
    use chrono::{TimeZone, Utc};

    fn tx() -> Transaction {
        Transaction::new("t1", "u1", "ecommerce", 80.0, Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap())
            .with_email("jane1987@Example.COM")
            .with_countries("US", "RO")
            .with_account_created(Utc.with_ymd_and_hms(2026, 2, 27, 23, 30, 0).unwrap())
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_millis(200)
    }

    #[tokio::test]
    async fn test_derived_fields() {
        let builder = FeatureContextBuilder::new(Arc::new(InMemoryVelocityStore::default()));
        let built = builder.build(&tx(), deadline()).await.unwrap();
        let ctx = built.context;

        assert_eq!(ctx.num(fields::ACCOUNT_AGE_DAYS), Ok(Some(2.0)));
        assert_eq!(ctx.num(fields::HOUR_OF_DAY), Ok(Some(23.0)));
        assert_eq!(ctx.text(fields::EMAIL_DOMAIN), Ok(Some("example.com")));
        assert_eq!(ctx.num(fields::EMAIL_LOCAL_DIGITS_RATIO), Ok(Some(0.5)));
        assert_eq!(ctx.flag(fields::GEO_MISMATCH), Ok(Some(true)));
        assert_eq!(ctx.num("user_count_1h"), Ok(Some(0.0)));
        // no device on the transaction: device velocity is absent, not zero
        assert_eq!(ctx.num("device_count_1h"), Ok(None));
        assert_eq!(ctx.num(fields::USER_AVG_AMOUNT_30D), Ok(None));
        assert!(built.degradations.is_empty());
    }

    #[tokio::test]
    async fn test_timezone_offset_shifts_hour() {
        let builder = FeatureContextBuilder::new(Arc::new(InMemoryVelocityStore::default()));
        let tx = tx().with_attribute(fields::TIMEZONE_OFFSET_MINUTES, serde_json::json!(120));

        let ctx = builder.build(&tx, deadline()).await.unwrap().context;
        assert_eq!(ctx.num(fields::HOUR_OF_DAY), Ok(Some(1.0)));
    }

    #[tokio::test]
    async fn test_core_fields_win_over_attributes_and_signals() {
        let mut values = SignalValues::new();
        values.insert("verified".to_string(), FieldValue::Bool(true));
        let identity = StaticSignalProvider::new("idv", SignalKind::Identity).with_entry("u1", values);

        let builder = FeatureContextBuilder::new(Arc::new(InMemoryVelocityStore::default()))
            .with_provider(Arc::new(identity));

        let tx = tx()
            .with_attribute("amount", serde_json::json!(1))
            .with_attribute("identity_verified", serde_json::json!(false))
            .with_attribute("gift_card_count", serde_json::json!(3))
            .with_attribute("cart", serde_json::json!({"items": 2}));

        let ctx = builder.build(&tx, deadline()).await.unwrap().context;
        assert_eq!(ctx.num(fields::AMOUNT), Ok(Some(80.0)));
        assert_eq!(ctx.flag(fields::IDENTITY_VERIFIED), Ok(Some(true)));
        assert_eq!(ctx.num(fields::GIFT_CARD_COUNT), Ok(Some(3.0)));
        assert!(!ctx.contains("cart"));
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_signals() {
        let identity = StaticSignalProvider::new("idv", SignalKind::Identity);
        let builder = FeatureContextBuilder::new(Arc::new(InMemoryVelocityStore::default()))
            .with_provider(Arc::new(identity));

        let built = builder.build(&tx(), Instant::now()).await.unwrap();
        assert_eq!(
            built.degradations,
            vec![Degradation::DeadlineExceeded { stage: "signals".to_string() }]
        );
    }
}
