//! Display sinks.
//!
//! A sink presents rendered frames and reports key presses back to the
//! loop. `NullSink` runs headless; `MinifbSink` (feature `display-minifb`)
//! opens a real window.

pub mod headless;
#[cfg(feature = "display-minifb")]
pub mod window;

pub use headless::NullSink;
#[cfg(feature = "display-minifb")]
pub use window::MinifbSink;

use anyhow::Result;

use crate::frame::Frame;

/// Key presses the loop reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    /// Request shutdown (`q`, Escape, window closed).
    Quit,
    /// Write the current rendered frame to disk (`s`).
    SaveFrame,
}

// No `Send` bound: window handles hold thread-affine platform pointers,
// and the loop owns its sink on a single thread. Cross-thread observers
// read the shared frame slot instead.
pub trait DisplaySink {
    fn name(&self) -> &'static str;

    /// Present one rendered frame.
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Next pending key event, if any. Drained once per tick.
    fn poll_key(&mut self) -> Option<KeyEvent>;
}
