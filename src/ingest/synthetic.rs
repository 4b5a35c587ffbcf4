//! Synthetic frame source for tests and `stub://` deployments.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::frame::{Frame, FRAME_CHANNELS};
use crate::ingest::{CameraSettings, FrameSource};

/// Deterministic-enough stand-in for a camera.
///
/// Paces frames at the configured fps and changes the simulated scene every
/// `SCENE_CHANGE_EVERY` frames so stub classification has signal to react
/// to. A little random speckle keeps consecutive frames from hashing equal.
pub struct SyntheticSource {
    settings: CameraSettings,
    started: bool,
    frame_count: u64,
    scene_state: u8,
    last_frame_at: Option<Instant>,
}

const SCENE_CHANGE_EVERY: u64 = 50;

impl SyntheticSource {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            started: false,
            frame_count: 0,
            scene_state: 0,
            last_frame_at: None,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.settings.fps.max(1)
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count =
            self.settings.width as usize * self.settings.height as usize * FRAME_CHANNELS;
        if self.frame_count % SCENE_CHANGE_EVERY == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let speckle: u8 = rand::thread_rng().gen();
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.scene_state as u64 * 37 + speckle as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        log::info!(
            "synthetic source started: {}x{} @ {}fps",
            self.settings.width,
            self.settings.height,
            self.settings.fps
        );
        Ok(())
    }

    fn latest_frame(&mut self) -> Result<Option<Frame>> {
        if !self.started {
            return Err(anyhow!("synthetic source polled before start"));
        }
        // Pace to the configured fps; between frames the loop sees None and
        // takes its idle sleep, exactly like a real camera.
        let now = Instant::now();
        if let Some(last) = self.last_frame_at {
            if now.duration_since(last) < self.frame_period() {
                return Ok(None);
            }
        }
        self.last_frame_at = Some(now);
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        let frame = Frame::from_rgb8(pixels, self.settings.width, self.settings.height)?;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        if self.started {
            self.started = false;
            log::info!("synthetic source stopped after {} frames", self.frame_count);
        }
    }

    fn is_healthy(&self) -> bool {
        self.started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_settings() -> CameraSettings {
        CameraSettings {
            width: 32,
            height: 24,
            fps: 1000,
        }
    }

    #[test]
    fn polling_before_start_is_an_error() {
        let mut source = SyntheticSource::new(fast_settings());
        assert!(source.latest_frame().is_err());
    }

    #[test]
    fn produces_frames_with_configured_dimensions() {
        let mut source = SyntheticSource::new(fast_settings());
        source.start().unwrap();
        let frame = loop {
            if let Some(frame) = source.latest_frame().unwrap() {
                break frame;
            }
        };
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut source = SyntheticSource::new(fast_settings());
        source.start().unwrap();
        source.stop();
        source.stop();
        assert!(!source.is_healthy());
    }
}
