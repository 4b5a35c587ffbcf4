//! Stub classifier for tests and stub deployments.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::classify::{Classifier, Prediction};
use crate::frame::Frame;

const STILL_CONFIDENCE: f32 = 0.95;
const CHANGE_CONFIDENCE: f32 = 0.85;

/// Hash-based classifier: a frame identical to the previous one reads as
/// the first class, a changed frame as the second. Deterministic given the
/// frame sequence, which is all the loop tests need.
pub struct StubClassifier {
    labels: Vec<String>,
    last_hash: Option<[u8; 32]>,
}

impl StubClassifier {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            last_hash: None,
        }
    }

    /// Two-class default matching a minimal Teachable Machine export.
    pub fn with_default_labels() -> Self {
        Self::new(vec!["Background".to_string(), "Object".to_string()])
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_ready(&self) -> bool {
        !self.labels.is_empty()
    }

    fn predict(&mut self, frame: &Frame) -> Result<Prediction> {
        if self.labels.is_empty() {
            return Err(anyhow!("stub classifier has no labels"));
        }
        let current: [u8; 32] = Sha256::digest(frame.data()).into();
        let changed = match self.last_hash {
            Some(prev) => prev != current,
            None => false,
        };
        self.last_hash = Some(current);

        let (index, confidence) = if changed {
            (1usize.min(self.labels.len() - 1), CHANGE_CONFIDENCE)
        } else {
            (0, STILL_CONFIDENCE)
        };
        Ok(Prediction {
            label: self.labels[index].clone(),
            confidence,
        })
    }
}
