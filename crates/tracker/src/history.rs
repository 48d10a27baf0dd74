use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use common::PriceSample;

/// Result of `SampleStore::append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { pruned: usize },
    /// The sample was older than the current tail and was dropped.
    OutOfOrder,
}

/// Append-only, time-bounded price history.
///
/// Samples are kept in ascending timestamp order. Equal timestamps are allowed.
/// Every append evicts samples older than `retention` relative to the new
/// sample, then trims to `max_samples` if a cap is set.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: VecDeque<PriceSample>,
    retention: Duration,
    max_samples: Option<usize>,
}

impl SampleStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            retention,
            max_samples: None,
        }
    }

    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn append(&mut self, sample: PriceSample) -> AppendOutcome {
        if let Some(tail) = self.samples.back() {
            if sample.timestamp < tail.timestamp {
                warn!(
                    sample = %sample.timestamp,
                    tail = %tail.timestamp,
                    "Dropping out-of-order price sample"
                );
                return AppendOutcome::OutOfOrder;
            }
        }

        self.samples.push_back(sample);
        let pruned = self.evict_old(sample.timestamp) + self.enforce_cap();
        if pruned > 0 {
            debug!(pruned, retained = self.samples.len(), "Pruned price history");
        }
        AppendOutcome::Appended { pruned }
    }

    /// Replace the content with previously persisted samples.
    /// Input is sorted by timestamp and pruned against `now`; samples stamped
    /// after `now` are dropped so they cannot block later appends.
    pub fn seed(&mut self, mut samples: Vec<PriceSample>, now: DateTime<Utc>) {
        let before = samples.len();
        samples.retain(|s| s.timestamp <= now);
        let future = before - samples.len();
        if future > 0 {
            warn!(dropped = future, now = %now, "Dropping price samples dated in the future");
        }
        samples.sort_by_key(|s| s.timestamp);
        self.samples = samples.into();
        self.evict_old(now);
        self.enforce_cap();
    }

    /// Most recent sample with `timestamp <= target`, if any.
    pub fn sample_at_or_before(&self, target: DateTime<Utc>) -> Option<&PriceSample> {
        let idx = self.samples.partition_point(|s| s.timestamp <= target);
        idx.checked_sub(1).and_then(|i| self.samples.get(i))
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn evict_old(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let mut evicted = 0;
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }
        evicted
    }

    fn enforce_cap(&mut self) -> usize {
        let Some(cap) = self.max_samples else {
            return 0;
        };
        let excess = self.samples.len().saturating_sub(cap);
        self.samples.drain(..excess);
        excess
    }
}
