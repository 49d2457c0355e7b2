//! Metrics Types
//!
//! Dashboard aggregates per vertical. KHÔNG chứa bucket logic.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hard cap on `top_flags`
pub const TOP_FLAGS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricsPeriod {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl MetricsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsPeriod::OneHour => "1h",
            MetricsPeriod::OneDay => "24h",
            MetricsPeriod::SevenDays => "7d",
            MetricsPeriod::ThirtyDays => "30d",
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            MetricsPeriod::OneHour => 1,
            MetricsPeriod::OneDay => 24,
            MetricsPeriod::SevenDays => 24 * 7,
            MetricsPeriod::ThirtyDays => 24 * 30,
        }
    }
}

impl std::fmt::Display for MetricsPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(MetricsPeriod::OneHour),
            "24h" | "1d" => Ok(MetricsPeriod::OneDay),
            "7d" => Ok(MetricsPeriod::SevenDays),
            "30d" => Ok(MetricsPeriod::ThirtyDays),
            other => Err(format!("unknown metrics period '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCount {
    pub rule_id: String,
    pub count: u64,
}

/// `GetVerticalMetrics(vertical, period)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalMetrics {
    pub vertical: String,
    pub period: MetricsPeriod,
    pub volume: u64,
    pub approved: u64,
    pub reviewed: u64,
    pub declined: u64,
    pub degraded: u64,
    pub decline_rate: f64,
    pub review_rate: f64,
    pub degraded_rate: f64,
    /// count desc, then rule id asc
    pub top_flags: Vec<FlagCount>,
}
