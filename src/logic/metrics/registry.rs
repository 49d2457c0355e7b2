//! Metrics Registry
//!
//! Hourly buckets per vertical, retained for 30 days. One short lock per
//! decision; reads sum the buckets that fall inside the period.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::logic::scoring::{Decision, DecisionResult};

use super::types::{FlagCount, MetricsPeriod, VerticalMetrics, TOP_FLAGS_LIMIT};

const SECS_PER_HOUR: i64 = 3600;
const RETENTION_HOURS: i64 = 24 * 30;

#[derive(Debug, Default, Clone)]
struct HourBucket {
    approved: u64,
    reviewed: u64,
    declined: u64,
    degraded: u64,
    flags: HashMap<String, u64>,
}

#[derive(Default)]
struct Buckets {
    /// vertical → hour epoch → bucket
    verticals: HashMap<String, BTreeMap<i64, HourBucket>>,
    /// Latest hour all verticals were swept at
    swept_hour: i64,
}

#[derive(Default)]
pub struct MetricsRegistry {
    inner: Mutex<Buckets>,
}

fn hour_of(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(SECS_PER_HOUR)
}

fn drop_expired(buckets: &mut BTreeMap<i64, HourBucket>, oldest: i64) {
    while let Some((&first, _)) = buckets.first_key_value() {
        if first > oldest {
            break;
        }
        buckets.remove(&first);
    }
}

fn rate(part: u64, volume: u64) -> f64 {
    if volume == 0 {
        0.0
    } else {
        part as f64 / volume as f64
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: &DecisionResult, at: DateTime<Utc>) {
        let hour = hour_of(at);
        let mut inner = self.inner.lock();
        let buckets = inner.verticals.entry(result.vertical.clone()).or_default();

        let bucket = buckets.entry(hour).or_default();
        match result.decision {
            Decision::Approve => bucket.approved += 1,
            Decision::Review => bucket.reviewed += 1,
            Decision::Decline => bucket.declined += 1,
        }
        if result.degraded {
            bucket.degraded += 1;
        }
        for contribution in &result.flags {
            *bucket.flags.entry(contribution.flag.rule_id.clone()).or_insert(0) += 1;
        }

        // retention
        drop_expired(buckets, hour - RETENTION_HOURS);

        // once per hour, expire every vertical and forget the empty ones
        if hour > inner.swept_hour {
            inner.swept_hour = hour;
            let oldest = hour - RETENTION_HOURS;
            inner.verticals.retain(|_, buckets| {
                drop_expired(buckets, oldest);
                !buckets.is_empty()
            });
        }
    }

    /// Aggregate the `period` ending at `now` (inclusive of the current hour)
    pub fn snapshot(&self, vertical: &str, period: MetricsPeriod, now: DateTime<Utc>) -> VerticalMetrics {
        let current = hour_of(now);
        let from = current - period.hours();

        let mut total = HourBucket::default();
        if let Some(buckets) = self.inner.lock().verticals.get(vertical) {
            for (_, bucket) in buckets.range(from + 1..=current) {
                total.approved += bucket.approved;
                total.reviewed += bucket.reviewed;
                total.declined += bucket.declined;
                total.degraded += bucket.degraded;
                for (rule_id, count) in &bucket.flags {
                    *total.flags.entry(rule_id.clone()).or_insert(0) += count;
                }
            }
        }

        let volume = total.approved + total.reviewed + total.declined;

        let mut top_flags: Vec<FlagCount> = total
            .flags
            .into_iter()
            .map(|(rule_id, count)| FlagCount { rule_id, count })
            .collect();
        top_flags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule_id.cmp(&b.rule_id)));
        top_flags.truncate(TOP_FLAGS_LIMIT);

        VerticalMetrics {
            vertical: vertical.to_string(),
            period,
            volume,
            approved: total.approved,
            reviewed: total.reviewed,
            declined: total.declined,
            degraded: total.degraded,
            decline_rate: rate(total.declined, volume),
            review_rate: rate(total.reviewed, volume),
            degraded_rate: rate(total.degraded, volume),
            top_flags,
        }
    }

    pub fn verticals(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().verticals.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::VerticalPolicy;
    use crate::logic::rules::{Flag, RuleCategory, Severity};
    use crate::logic::scoring::{aggregate, Degradation, ModelOutcome};
    use chrono::{Duration, TimeZone};

    fn flag(id: &str, score: u32) -> Flag {
        Flag {
            rule_id: id.to_string(),
            rule_name: id.to_string(),
            category: RuleCategory::Custom,
            severity: Severity::Medium,
            score,
            confidence: 1.0,
            message: String::new(),
            metadata: Default::default(),
        }
    }

    fn result(vertical: &str, flags: Vec<Flag>, degraded: bool) -> DecisionResult {
        let breakdown = aggregate(flags, &VerticalPolicy::new(vertical), &ModelOutcome::NotConfigured);
        let degradations = if degraded { vec![Degradation::ModelTimeout] } else { Vec::new() };
        DecisionResult::new("t", vertical, breakdown, degradations, 0)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_counts_and_rates() {
        let reg = MetricsRegistry::new();
        reg.record(&result("crypto", vec![flag("A", 80)], false), now());
        reg.record(&result("crypto", vec![flag("A", 55), flag("B", 1)], true), now());
        reg.record(&result("crypto", vec![], false), now());
        reg.record(&result("crypto", vec![], false), now());
        reg.record(&result("gaming", vec![flag("A", 80)], false), now());

        let m = reg.snapshot("crypto", MetricsPeriod::OneHour, now());
        assert_eq!(m.volume, 4);
        assert_eq!((m.approved, m.reviewed, m.declined), (2, 1, 1));
        assert_eq!(m.decline_rate, 0.25);
        assert_eq!(m.degraded_rate, 0.25);
        assert_eq!(
            m.top_flags,
            vec![
                FlagCount { rule_id: "A".into(), count: 2 },
                FlagCount { rule_id: "B".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_period_boundaries() {
        let reg = MetricsRegistry::new();
        reg.record(&result("lending", vec![], false), now() - Duration::hours(2));
        reg.record(&result("lending", vec![], false), now() - Duration::days(3));
        reg.record(&result("lending", vec![], false), now());

        assert_eq!(reg.snapshot("lending", MetricsPeriod::OneHour, now()).volume, 1);
        assert_eq!(reg.snapshot("lending", MetricsPeriod::OneDay, now()).volume, 2);
        assert_eq!(reg.snapshot("lending", MetricsPeriod::SevenDays, now()).volume, 3);
    }

    #[test]
    fn test_retention_drops_old_buckets() {
        let reg = MetricsRegistry::new();
        reg.record(&result("lending", vec![], false), now() - Duration::days(40));
        reg.record(&result("lending", vec![], false), now());

        let inner = reg.inner.lock();
        assert_eq!(inner.verticals["lending"].len(), 1);
    }

    #[test]
    fn test_expired_verticals_are_forgotten() {
        let reg = MetricsRegistry::new();
        for i in 0..100 {
            reg.record(&result(&format!("junk-{}", i), vec![], false), now() - Duration::days(31));
        }
        reg.record(&result("lending", vec![], false), now() - Duration::days(2));
        assert_eq!(reg.verticals().len(), 101);

        reg.record(&result("crypto", vec![], false), now());
        assert_eq!(reg.verticals(), vec!["crypto".to_string(), "lending".to_string()]);
        assert_eq!(reg.snapshot("lending", MetricsPeriod::SevenDays, now()).volume, 1);
    }

    #[test]
    fn test_unknown_vertical_is_empty() {
        let m = MetricsRegistry::new().snapshot("space", MetricsPeriod::ThirtyDays, now());
        assert_eq!(m.volume, 0);
        assert_eq!(m.decline_rate, 0.0);
        assert!(m.top_flags.is_empty());
    }

    #[test]
    fn test_top_flags_capped() {
        let reg = MetricsRegistry::new();
        let flags = (0..15).map(|i| flag(&format!("R{:02}", i), 1)).collect();
        reg.record(&result("ecommerce", flags, false), now());

        let m = reg.snapshot("ecommerce", MetricsPeriod::OneDay, now());
        assert_eq!(m.top_flags.len(), TOP_FLAGS_LIMIT);
        assert_eq!(m.top_flags[0].rule_id, "R00");
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("24h".parse::<MetricsPeriod>(), Ok(MetricsPeriod::OneDay));
        assert!("2w".parse::<MetricsPeriod>().is_err());
    }
}
