//! Frame sources.
//!
//! A source owns the capture device and hands the newest decoded frame to
//! the loop on demand:
//! - `LibcameraSource`: a `libcamera-vid` subprocess streaming MJPEG
//! - `SyntheticSource`: deterministic `stub://` source for tests and demos
//!
//! Sources publish into a single-slot cell, so the loop always sees the
//! freshest frame and slow consumers simply drop intermediates.

pub mod libcamera;
pub mod synthetic;

pub use libcamera::{LibcameraConfig, LibcameraSource};
pub use synthetic::SyntheticSource;

use anyhow::Result;

use crate::frame::Frame;

/// Camera resolution and pacing shared by all sources.
#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// A camera-facing frame supplier.
pub trait FrameSource: Send {
    fn name(&self) -> &'static str;

    /// Begin producing frames. Must succeed before `latest_frame` is polled.
    fn start(&mut self) -> Result<()>;

    /// The most recent decoded frame, or `None` when nothing new has
    /// arrived since the last poll.
    fn latest_frame(&mut self) -> Result<Option<Frame>>;

    /// Stop capture and release the device. Idempotent.
    fn stop(&mut self);

    /// False once the source has stopped responding.
    fn is_healthy(&self) -> bool;
}
