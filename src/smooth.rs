//! Majority-vote smoothing over the trailing detection window.
//!
//! The classifier's instantaneous jitter never reaches the screen directly.
//! The smoothing engine re-derives a single stable (label, confidence) pair
//! from the history on every tick: majority label over the trailing window,
//! confidence averaged among samples of that label only. A single spurious
//! low-confidence frame cannot flip the display while the majority label is
//! stable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::history::DetectionHistory;

/// Canonical label when the trailing window holds no samples.
pub const NO_DETECTION_LABEL: &str = "No detection";

/// Default trailing window when the config does not override it.
pub const DEFAULT_SMOOTHING_WINDOW: Duration = Duration::from_millis(2000);

/// Derived display value. Recomputed on demand, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedDetection {
    pub label: String,
    pub confidence: f32,
}

impl SmoothedDetection {
    pub fn none() -> Self {
        Self {
            label: NO_DETECTION_LABEL.to_string(),
            confidence: 0.0,
        }
    }
}

/// Smooth the history into one (label, confidence) pair.
///
/// Majority label by sample count within the window; ties go to the label
/// inserted earliest among the tied ones, so equal counts cannot make the
/// display flicker. Confidence is the arithmetic mean over samples of the
/// majority label. Deterministic for identical inputs.
pub fn smooth(history: &DetectionHistory, now: Instant, window: Duration) -> SmoothedDetection {
    let recent = history.snapshot_within(window, now);
    if recent.is_empty() {
        return SmoothedDetection::none();
    }

    // Count per label, remembering each label's first position in the
    // snapshot. The first-seen index makes the winner independent of
    // HashMap iteration order.
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, sample) in recent.iter().enumerate() {
        let entry = tally.entry(sample.label.as_str()).or_insert((0, index));
        entry.0 += 1;
    }

    // Every real count is at least 1, so any entry beats the seed.
    let mut majority: &str = NO_DETECTION_LABEL;
    let mut best = (0usize, usize::MAX);
    for (label, (count, first_seen)) in &tally {
        if *count > best.0 || (*count == best.0 && *first_seen < best.1) {
            majority = *label;
            best = (*count, *first_seen);
        }
    }

    let (sum, count) = recent
        .iter()
        .filter(|sample| sample.label == majority)
        .fold((0.0f32, 0usize), |(sum, count), sample| {
            (sum + sample.confidence, count + 1)
        });

    SmoothedDetection {
        label: majority.to_string(),
        confidence: sum / count as f32,
    }
}
