//! Image classification.
//!
//! A classifier maps a frame to a single best label with a confidence in
//! [0, 1]. Backends:
//! - `StubClassifier`: frame-hash heuristic for tests and stub deployments
//! - `TractClassifier`: ONNX inference via tract (feature `backend-tract`)

mod labels;
mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use labels::load_labels;
pub use stub::StubClassifier;
#[cfg(feature = "backend-tract")]
pub use tract::TractClassifier;

use anyhow::Result;

use crate::frame::Frame;

/// One classifier invocation result.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

pub trait Classifier: Send {
    fn name(&self) -> &'static str;

    /// False until the model and labels are loaded. The loop refuses to
    /// start against a classifier that is not ready.
    fn is_ready(&self) -> bool;

    /// Classify one frame. Expected to return within a bounded time; a
    /// failed call costs that tick its sample, nothing more.
    fn predict(&mut self, frame: &Frame) -> Result<Prediction>;
}
