//! camspot: camera detection smoothing and display overlay.
//!
//! A single detection loop captures frames from a [`ingest::FrameSource`],
//! classifies them on a throttled cadence, smooths the recent predictions
//! by majority vote over a trailing time window, and draws a status overlay
//! on every frame before handing it to a [`display::DisplaySink`].
//!
//! The library layer is backend-agnostic: camera, classifier, and display
//! are traits, with a synthetic source and a stub classifier built in so
//! the whole pipeline runs without hardware.

pub mod classify;
pub mod config;
pub mod display;
pub mod error;
pub mod font;
pub mod frame;
pub mod history;
pub mod ingest;
pub mod overlay;
pub mod runner;
pub mod shared;
pub mod smooth;

pub use error::PipelineError;
pub use frame::Frame;
pub use history::{DetectionHistory, DetectionSample, DEFAULT_HISTORY_CAPACITY};
pub use overlay::{ConfidenceBand, OverlayConfig, OverlayRenderer};
pub use runner::{DetectionLoop, LoopConfig, LoopState, LoopStats};
pub use smooth::{smooth, SmoothedDetection, DEFAULT_SMOOTHING_WINDOW, NO_DETECTION_LABEL};
