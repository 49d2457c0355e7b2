//! Sliding Bucket Rings
//!
//! Fixed-size ring of time buckets per window. Reads are O(window/granularity),
//! memory is bounded per subject regardless of traffic.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::{SubjectAggregates, VelocityAggregate, Window};

// ============================================================================
// BUCKET
// ============================================================================

#[derive(Debug, Clone)]
struct Bucket {
    /// Absolute bucket index (timestamp / granularity); i64::MIN = never used
    epoch: i64,
    count: u64,
    sum: f64,
    distinct: HashSet<String>,
}

impl Bucket {
    fn empty() -> Self {
        Self {
            epoch: i64::MIN,
            count: 0,
            sum: 0.0,
            distinct: HashSet::new(),
        }
    }

    fn reset(&mut self, epoch: i64) {
        self.epoch = epoch;
        self.count = 0;
        self.sum = 0.0;
        self.distinct.clear();
    }
}

// ============================================================================
// RING
// ============================================================================

/// One window's worth of buckets
#[derive(Debug, Clone)]
pub struct BucketRing {
    window: Window,
    buckets: Vec<Bucket>,
}

impl BucketRing {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            buckets: vec![Bucket::empty(); window.bucket_count()],
        }
    }

    fn epoch_of(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp().div_euclid(self.window.granularity_secs())
    }

    fn slot(&self, epoch: i64) -> usize {
        epoch.rem_euclid(self.buckets.len() as i64) as usize
    }

    /// Record one event. Events older than anything the ring can still hold
    /// for that slot are dropped.
    pub fn record(&mut self, at: DateTime<Utc>, amount: f64, secondary: Option<&str>) {
        let epoch = self.epoch_of(at);
        let idx = self.slot(epoch);
        let bucket = &mut self.buckets[idx];

        if bucket.epoch < epoch {
            bucket.reset(epoch);
        } else if bucket.epoch > epoch {
            return;
        }

        bucket.count += 1;
        bucket.sum += amount;
        if let Some(id) = secondary {
            if !bucket.distinct.contains(id) {
                bucket.distinct.insert(id.to_string());
            }
        }
    }

    /// Aggregate over buckets `(as_of - window, as_of]` at bucket resolution.
    /// Buckets newer than `as_of` are not counted.
    pub fn aggregate(&self, as_of: DateTime<Utc>) -> VelocityAggregate {
        let newest = self.epoch_of(as_of);
        let oldest = newest - self.buckets.len() as i64 + 1;

        let mut agg = VelocityAggregate::default();
        let mut distinct: HashSet<&str> = HashSet::new();

        for bucket in &self.buckets {
            if bucket.epoch < oldest || bucket.epoch > newest {
                continue;
            }
            agg.count += bucket.count;
            agg.sum += bucket.sum;
            distinct.extend(bucket.distinct.iter().map(String::as_str));
        }

        agg.distinct = distinct.len() as u64;
        agg
    }
}

// ============================================================================
// SUBJECT STATE
// ============================================================================

/// All rings for one subject
#[derive(Debug, Clone)]
pub struct SubjectState {
    rings: [BucketRing; 4],
    last_seen: DateTime<Utc>,
}

impl SubjectState {
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            rings: Window::ALL.map(BucketRing::new),
            last_seen: first_seen,
        }
    }

    pub fn record(&mut self, at: DateTime<Utc>, amount: f64, secondary: Option<&str>) {
        for ring in &mut self.rings {
            ring.record(at, amount, secondary);
        }
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    pub fn aggregates(&self, as_of: DateTime<Utc>) -> SubjectAggregates {
        let mut out = SubjectAggregates::default();
        for ring in &self.rings {
            *out.window_mut(ring.window) = ring.aggregate(as_of);
        }
        out
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// True once nothing in the longest window can still be read
    pub fn is_expired(&self, as_of: DateTime<Utc>) -> bool {
        (as_of - self.last_seen).num_seconds() > Window::longest().span_secs()
    }
}
