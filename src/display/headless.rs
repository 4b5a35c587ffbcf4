//! Headless display sink.

use anyhow::Result;

use crate::display::{DisplaySink, KeyEvent};
use crate::frame::Frame;

/// Accepts every frame and produces no key events. Used when the daemon
/// runs without a window; the shared frame slot remains the way to observe
/// output.
#[derive(Default)]
pub struct NullSink {
    presented: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        self.presented += 1;
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyEvent> {
        None
    }
}
