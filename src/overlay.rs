//! Overlay renderer.
//!
//! Paints the smoothed detection onto a copy of the current frame: a
//! semi-transparent info panel top-left, a color-coded confidence bar
//! top-right, and an FPS/resolution line bottom-right. Pure with respect to
//! the input frame; the caller's buffer is never touched.

use crate::error::PipelineError;
use crate::font;
use crate::frame::{Frame, FRAME_CHANNELS};
use crate::smooth::SmoothedDetection;

pub type Rgb = [u8; 3];

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_BAND_HIGH: f32 = 0.7;
pub const DEFAULT_BAND_MEDIUM: f32 = 0.5;

const PANEL_ALPHA: f32 = 0.7;
const PANEL_COLOR: Rgb = [0, 0, 0];
const BAR_WIDTH: i32 = 300;
const BAR_HEIGHT: i32 = 30;
const BAR_BACKGROUND: Rgb = [50, 50, 50];
const BORDER_COLOR: Rgb = [255, 255, 255];
const INFO_COLOR: Rgb = [255, 255, 255];

const COLOR_HIGH: Rgb = [0, 255, 0];
const COLOR_MEDIUM: Rgb = [255, 255, 0];
const COLOR_LOW: Rgb = [255, 0, 0];

/// Confidence band. The single source of color truth: the status text and
/// the bar fill both go through `OverlayConfig::band`, so their thresholds
/// cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn color(self) -> Rgb {
        match self {
            ConfidenceBand::High => COLOR_HIGH,
            ConfidenceBand::Medium => COLOR_MEDIUM,
            ConfidenceBand::Low => COLOR_LOW,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OverlayConfig {
    /// Above this, the status line reads DETECTED.
    pub confidence_threshold: f32,
    /// Above this, the band is High.
    pub band_high: f32,
    /// Above this (and not High), the band is Medium.
    pub band_medium: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            band_high: DEFAULT_BAND_HIGH,
            band_medium: DEFAULT_BAND_MEDIUM,
        }
    }
}

impl OverlayConfig {
    pub fn band(&self, confidence: f32) -> ConfidenceBand {
        if confidence > self.band_high {
            ConfidenceBand::High
        } else if confidence > self.band_medium {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn is_detected(&self, confidence: f32) -> bool {
        confidence > self.confidence_threshold
    }
}

pub struct OverlayRenderer {
    config: OverlayConfig,
}

impl OverlayRenderer {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Render the overlay onto a copy of `frame`.
    ///
    /// The input frame is read-only; the returned frame is a new buffer.
    /// Empty input signals `InvalidFrame`.
    pub fn render(
        &self,
        frame: &Frame,
        smoothed: &SmoothedDetection,
        fps_hint: f32,
    ) -> Result<Frame, PipelineError> {
        if frame.is_empty() {
            return Err(PipelineError::InvalidFrame);
        }
        let mut out = frame.clone();
        self.draw_panel(&mut out, smoothed);
        self.draw_confidence_bar(&mut out, smoothed.confidence);
        self.draw_frame_info(&mut out, fps_hint);
        Ok(out)
    }

    fn draw_panel(&self, frame: &mut Frame, smoothed: &SmoothedDetection) {
        let width = frame.width() as i32;
        blend_rect(frame, 10, 10, width - 20, 110, PANEL_COLOR, PANEL_ALPHA);

        let band_color = self.config.band(smoothed.confidence).color();
        let status = if self.config.is_detected(smoothed.confidence) {
            "STATUS: DETECTED"
        } else {
            "STATUS: NO DETECTION"
        };

        font::draw_text(frame, 20, 20, &format!("OBJECT: {}", smoothed.label), band_color, 2);
        font::draw_text(
            frame,
            20,
            50,
            &format!("CONFIDENCE: {:.1}%", smoothed.confidence * 100.0),
            band_color,
            2,
        );
        font::draw_text(frame, 20, 80, status, band_color, 2);
    }

    fn draw_confidence_bar(&self, frame: &mut Frame, confidence: f32) {
        let width = frame.width() as i32;
        let bar_w = BAR_WIDTH.min(width - 40).max(0);
        if bar_w == 0 {
            return;
        }
        let bar_x = width - bar_w - 20;
        let bar_y = 130;

        fill_rect(frame, bar_x, bar_y, bar_w, BAR_HEIGHT, BAR_BACKGROUND);

        // Fill left-to-right, proportional to confidence, band-colored.
        let clamped = confidence.clamp(0.0, 1.0);
        let fill_w = (bar_w as f32 * clamped) as i32;
        let fill_color = self.config.band(confidence).color();
        fill_rect(frame, bar_x, bar_y, fill_w, BAR_HEIGHT, fill_color);

        stroke_rect(frame, bar_x, bar_y, bar_w, BAR_HEIGHT, BORDER_COLOR, 2);

        let percent = format!("{:.1}%", clamped * 100.0);
        let text_w = font::text_width(&percent, 2) as i32;
        let text_x = bar_x + (bar_w - text_w) / 2;
        let text_y = bar_y + (BAR_HEIGHT - (font::GLYPH_HEIGHT as i32 * 2)) / 2;
        font::draw_text(frame, text_x, text_y, &percent, BORDER_COLOR, 2);
    }

    fn draw_frame_info(&self, frame: &mut Frame, fps_hint: f32) {
        let width = frame.width() as i32;
        let height = frame.height() as i32;
        let fps_text = format!("FPS: {:.1}", fps_hint);
        let res_text = format!("{}X{}", frame.width(), frame.height());
        font::draw_text(frame, width - 150, height - 40, &res_text, INFO_COLOR, 1);
        font::draw_text(frame, width - 150, height - 20, &fps_text, INFO_COLOR, 1);
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

fn clip(frame: &Frame, x: i32, y: i32, w: i32, h: i32) -> Option<(usize, usize, usize, usize)> {
    let frame_w = frame.width() as i32;
    let frame_h = frame.height() as i32;
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(frame_w);
    let y1 = (y + h).min(frame_h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
}

fn fill_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
    let Some((x0, y0, x1, y1)) = clip(frame, x, y, w, h) else {
        return;
    };
    let stride = frame.width() as usize * FRAME_CHANNELS;
    let data = frame.data_mut();
    for row in y0..y1 {
        for col in x0..x1 {
            let idx = row * stride + col * FRAME_CHANNELS;
            data[idx..idx + FRAME_CHANNELS].copy_from_slice(&color);
        }
    }
}

fn blend_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: Rgb, alpha: f32) {
    let Some((x0, y0, x1, y1)) = clip(frame, x, y, w, h) else {
        return;
    };
    let alpha = alpha.clamp(0.0, 1.0);
    let stride = frame.width() as usize * FRAME_CHANNELS;
    let data = frame.data_mut();
    for row in y0..y1 {
        for col in x0..x1 {
            let idx = row * stride + col * FRAME_CHANNELS;
            for channel in 0..FRAME_CHANNELS {
                let base = data[idx + channel] as f32;
                let over = color[channel] as f32;
                data[idx + channel] = (over * alpha + base * (1.0 - alpha)) as u8;
            }
        }
    }
}

fn stroke_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: Rgb, thickness: i32) {
    let t = thickness.max(1);
    fill_rect(frame, x, y, w, t, color);
    fill_rect(frame, x, y + h - t, w, t, color);
    fill_rect(frame, x, y, t, h, color);
    fill_rect(frame, x + w - t, y, t, h, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::SmoothedDetection;

    fn smoothed(label: &str, confidence: f32) -> SmoothedDetection {
        SmoothedDetection {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn render_does_not_mutate_the_input_frame() {
        let frame = Frame::filled(640, 480, [10, 20, 30]);
        let before = frame.data().to_vec();
        let renderer = OverlayRenderer::default();
        let rendered = renderer.render(&frame, &smoothed("cat", 0.9), 30.0).unwrap();
        assert_eq!(frame.data(), before.as_slice());
        assert_ne!(rendered.data(), before.as_slice());
    }

    #[test]
    fn empty_frame_signals_invalid_frame() {
        let frame = Frame::from_rgb8(Vec::new(), 0, 0).unwrap();
        let renderer = OverlayRenderer::default();
        let err = renderer
            .render(&frame, &smoothed("cat", 0.9), 30.0)
            .unwrap_err();
        assert_eq!(err, PipelineError::InvalidFrame);
    }

    #[test]
    fn bands_and_status_share_thresholds() {
        let config = OverlayConfig::default();
        for (confidence, band, detected) in [
            (0.0, ConfidenceBand::Low, false),
            (0.5, ConfidenceBand::Low, false),
            (0.51, ConfidenceBand::Medium, true),
            (0.7, ConfidenceBand::Medium, true),
            (0.71, ConfidenceBand::High, true),
            (1.0, ConfidenceBand::High, true),
        ] {
            assert_eq!(config.band(confidence), band, "band at {}", confidence);
            assert_eq!(
                config.is_detected(confidence),
                detected,
                "status at {}",
                confidence
            );
        }
    }

    #[test]
    fn custom_thresholds_move_the_bands() {
        let config = OverlayConfig {
            confidence_threshold: 0.3,
            band_high: 0.9,
            band_medium: 0.3,
        };
        assert_eq!(config.band(0.5), ConfidenceBand::Medium);
        assert_eq!(config.band(0.95), ConfidenceBand::High);
        assert!(config.is_detected(0.31));
    }

    #[test]
    fn bar_fill_matches_band_color() {
        // Bar region is band-colored after render; sample a pixel inside the
        // left edge of the fill for a high-confidence detection.
        let frame = Frame::filled(640, 480, [0, 0, 0]);
        let renderer = OverlayRenderer::default();
        let rendered = renderer.render(&frame, &smoothed("cat", 1.0), 0.0).unwrap();
        let bar_x = 640 - 300 - 20 + 5;
        let bar_y = 130 + 15;
        let idx = (bar_y * 640 + bar_x) * FRAME_CHANNELS;
        let pixel = &rendered.data()[idx..idx + 3];
        assert_eq!(pixel, ConfidenceBand::High.color());
    }

    #[test]
    fn tiny_frames_render_without_panicking() {
        let frame = Frame::filled(16, 12, [5, 5, 5]);
        let renderer = OverlayRenderer::default();
        renderer.render(&frame, &smoothed("x", 0.4), 1.0).unwrap();
    }
}
