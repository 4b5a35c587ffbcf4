#![cfg(feature = "display-minifb")]

//! minifb-backed display window.

use anyhow::{Context, Result};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::display::{DisplaySink, KeyEvent};
use crate::frame::{Frame, FRAME_CHANNELS};

pub struct MinifbSink {
    window: Window,
    buffer: Vec<u32>,
    closed: bool,
}

impl MinifbSink {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        let window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .context("failed to open display window")?;
        Ok(Self {
            window,
            buffer: vec![0u32; width as usize * height as usize],
            closed: false,
        })
    }

    fn fill_buffer(&mut self, frame: &Frame) {
        let pixels = frame.byte_len() / FRAME_CHANNELS;
        self.buffer.resize(pixels, 0);
        let data = frame.data();
        for (i, out) in self.buffer.iter_mut().enumerate() {
            let idx = i * FRAME_CHANNELS;
            let r = data[idx] as u32;
            let g = data[idx + 1] as u32;
            let b = data[idx + 2] as u32;
            *out = (r << 16) | (g << 8) | b;
        }
    }
}

impl DisplaySink for MinifbSink {
    fn name(&self) -> &'static str {
        "minifb"
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        if !self.window.is_open() {
            self.closed = true;
            return Ok(());
        }
        self.fill_buffer(frame);
        self.window
            .update_with_buffer(
                &self.buffer,
                frame.width() as usize,
                frame.height() as usize,
            )
            .context("window update failed")?;
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyEvent> {
        if self.closed || !self.window.is_open() {
            self.closed = true;
            return Some(KeyEvent::Quit);
        }
        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            return Some(KeyEvent::Quit);
        }
        if self.window.is_key_pressed(Key::S, KeyRepeat::No) {
            return Some(KeyEvent::SaveFrame);
        }
        None
    }
}
