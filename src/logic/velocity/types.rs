//! Velocity Types
//!
//! Subjects, windows and the aggregate read back for each (subject, window).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SUBJECT
// ============================================================================

/// What velocity is tracked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    User,
    Device,
    Network,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 3] = [SubjectKind::User, SubjectKind::Device, SubjectKind::Network];

    /// Field-name prefix in the context
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::User => "user",
            SubjectKind::Device => "device",
            SubjectKind::Network => "ip",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete subject, e.g. (user, "u-42")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: String,
}

impl Subject {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(SubjectKind::User, id)
    }

    pub fn device(id: impl Into<String>) -> Self {
        Self::new(SubjectKind::Device, id)
    }

    pub fn network(id: impl Into<String>) -> Self {
        Self::new(SubjectKind::Network, id)
    }

    /// Stable key used for shard selection
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

// ============================================================================
// WINDOWS
// ============================================================================

/// Fixed set of aggregation windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl Window {
    pub const ALL: [Window; 4] = [
        Window::OneHour,
        Window::OneDay,
        Window::SevenDays,
        Window::ThirtyDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::OneHour => "1h",
            Window::OneDay => "24h",
            Window::SevenDays => "7d",
            Window::ThirtyDays => "30d",
        }
    }

    pub fn span_secs(&self) -> i64 {
        match self {
            Window::OneHour => 3_600,
            Window::OneDay => 86_400,
            Window::SevenDays => 7 * 86_400,
            Window::ThirtyDays => 30 * 86_400,
        }
    }

    /// Bucket width. Reads cost span/granularity bucket visits.
    pub fn granularity_secs(&self) -> i64 {
        match self {
            Window::OneHour => 60,        // 60 buckets
            Window::OneDay => 15 * 60,    // 96 buckets
            Window::SevenDays => 3_600,   // 168 buckets
            Window::ThirtyDays => 6 * 3_600, // 120 buckets
        }
    }

    pub fn bucket_count(&self) -> usize {
        (self.span_secs() / self.granularity_secs()) as usize
    }

    pub fn span(&self) -> Duration {
        Duration::from_secs(self.span_secs() as u64)
    }

    pub fn longest() -> Window {
        Window::ThirtyDays
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// METRICS & AGGREGATES
// ============================================================================

/// Which part of an aggregate a context field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityMetric {
    Count,
    Sum,
    Distinct,
}

impl VelocityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            VelocityMetric::Count => "count",
            VelocityMetric::Sum => "sum",
            VelocityMetric::Distinct => "distinct",
        }
    }
}

/// Aggregate over one (subject, window)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityAggregate {
    pub count: u64,
    pub sum: f64,
    /// Distinct secondary identifiers (devices for a user, users for a device/ip)
    pub distinct: u64,
}

impl VelocityAggregate {
    pub fn get(&self, metric: VelocityMetric) -> f64 {
        match metric {
            VelocityMetric::Count => self.count as f64,
            VelocityMetric::Sum => self.sum,
            VelocityMetric::Distinct => self.distinct as f64,
        }
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// All windows for one subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectAggregates {
    pub one_hour: VelocityAggregate,
    pub one_day: VelocityAggregate,
    pub seven_days: VelocityAggregate,
    pub thirty_days: VelocityAggregate,
}

impl SubjectAggregates {
    pub fn window(&self, window: Window) -> &VelocityAggregate {
        match window {
            Window::OneHour => &self.one_hour,
            Window::OneDay => &self.one_day,
            Window::SevenDays => &self.seven_days,
            Window::ThirtyDays => &self.thirty_days,
        }
    }

    pub fn window_mut(&mut self, window: Window) -> &mut VelocityAggregate {
        match window {
            Window::OneHour => &mut self.one_hour,
            Window::OneDay => &mut self.one_day,
            Window::SevenDays => &mut self.seven_days,
            Window::ThirtyDays => &mut self.thirty_days,
        }
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

/// One scored transaction, recorded against every subject it touches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub transaction_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub device_id: Option<String>,
    pub ip_address: Option<String>,
}

impl Observation {
    /// Subjects touched, each paired with its secondary identifier
    /// (device for the user, user for device and ip).
    pub fn subjects(&self) -> Vec<(Subject, Option<&str>)> {
        let mut out = Vec::with_capacity(3);
        out.push((Subject::user(&self.user_id), self.device_id.as_deref()));
        if let Some(device) = &self.device_id {
            out.push((Subject::device(device), Some(self.user_id.as_str())));
        }
        if let Some(ip) = &self.ip_address {
            out.push((Subject::network(ip), Some(self.user_id.as_str())));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bucket_counts() {
        assert_eq!(Window::OneHour.bucket_count(), 60);
        assert_eq!(Window::OneDay.bucket_count(), 96);
        assert_eq!(Window::SevenDays.bucket_count(), 168);
        assert_eq!(Window::ThirtyDays.bucket_count(), 120);
    }

    #[test]
    fn test_observation_subjects() {
        let obs = Observation {
            transaction_id: "t1".to_string(),
            amount: 10.0,
            timestamp: Utc::now(),
            user_id: "u1".to_string(),
            device_id: None,
            ip_address: Some("10.0.0.1".to_string()),
        };

        let subjects = obs.subjects();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].0, Subject::user("u1"));
        assert_eq!(subjects[0].1, None);
        assert_eq!(subjects[1].1, Some("u1"));
    }
}
