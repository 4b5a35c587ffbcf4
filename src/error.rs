use std::fmt;

/// Failure taxonomy for the detection pipeline.
///
/// Startup failures (`SourceUnavailable`, `ModelUnavailable`) abort the run
/// and surface to the caller. Per-tick failures (`InferenceError`,
/// `InvalidFrame`, `RenderError`) are recovered locally by the loop
/// controller: the tick is skipped and the display keeps showing the last
/// good smoothed detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineError {
    /// The frame source cannot start or has stopped responding.
    SourceUnavailable(String),
    /// The classifier failed to initialize.
    ModelUnavailable(String),
    /// A single predict call failed; that tick contributes no new sample.
    InferenceError(String),
    /// Render was asked to draw on an empty or degenerate frame.
    InvalidFrame,
    /// The display sink failed to present a frame.
    RenderError(String),
}

impl PipelineError {
    /// True when the error must terminate the loop rather than skip a tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable(_) | PipelineError::ModelUnavailable(_)
        )
    }

    /// The collaborator this error names, for the fatal-failure message.
    pub fn collaborator(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "frame source",
            PipelineError::ModelUnavailable(_) => "classifier",
            PipelineError::InferenceError(_) => "classifier",
            PipelineError::InvalidFrame => "overlay renderer",
            PipelineError::RenderError(_) => "display sink",
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::SourceUnavailable(msg) => {
                write!(f, "frame source unavailable: {}", msg)
            }
            PipelineError::ModelUnavailable(msg) => write!(f, "classifier unavailable: {}", msg),
            PipelineError::InferenceError(msg) => write!(f, "inference failed: {}", msg),
            PipelineError::InvalidFrame => write!(f, "render called with an empty frame"),
            PipelineError::RenderError(msg) => write!(f, "display present failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
