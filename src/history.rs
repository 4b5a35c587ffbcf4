//! Bounded, time-stamped ring of recent classification results.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default ring capacity when the config does not override it.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One classifier invocation result with its capture instant.
///
/// Immutable once created; the loop controller builds one per inference.
#[derive(Clone, Debug)]
pub struct DetectionSample {
    pub label: String,
    pub confidence: f32,
    pub observed_at: Instant,
}

impl DetectionSample {
    pub fn new(label: impl Into<String>, confidence: f32, observed_at: Instant) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            observed_at,
        }
    }
}

/// Insertion-ordered ring of samples, oldest evicted first.
///
/// Single writer: only the detection loop appends. Samples arrive in
/// non-decreasing `observed_at` order.
pub struct DetectionHistory {
    samples: VecDeque<DetectionSample>,
    capacity: usize,
}

impl DetectionHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting the head when full. O(1) amortized.
    pub fn append(&mut self, sample: DetectionSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Samples with `observed_at >= now - window`, in insertion order.
    ///
    /// Non-mutating. When `now - window` underflows (the process just
    /// started), every sample qualifies.
    pub fn snapshot_within(&self, window: Duration, now: Instant) -> Vec<&DetectionSample> {
        let cutoff = now.checked_sub(window);
        self.samples
            .iter()
            .filter(|sample| match cutoff {
                Some(cutoff) => sample.observed_at >= cutoff,
                None => true,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionSample> {
        self.samples.iter()
    }
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}
