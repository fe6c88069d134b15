//! Metric - one logged data point of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metric data point.
///
/// Metrics are keyed by (`run_id`, `key`) and ordered by `step`. Searches
/// see the point with the highest step (latest timestamp on ties).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    key: String,
    value: f64,
    step: u64,
    timestamp: DateTime<Utc>,
}

impl Metric {
    /// Create a new metric stamped with the current time.
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64, step: u64) -> Self {
        Self::at(key, value, step, Utc::now())
    }

    /// Create a metric with an explicit timestamp.
    #[must_use]
    pub fn at(key: impl Into<String>, value: f64, step: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            step,
            timestamp,
        }
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the step/epoch number.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Get the timestamp when the metric was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether `self` supersedes `other` as the latest value of the key.
    #[must_use]
    pub fn supersedes(&self, other: &Self) -> bool {
        (self.step, self.timestamp) >= (other.step, other.timestamp)
    }
}
