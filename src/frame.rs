//! Decoded camera frames.
//!
//! A `Frame` is a packed RGB8 pixel buffer. Frames are owned transiently by
//! whichever component currently holds them; the overlay renderer works on a
//! clone and never mutates the caller's buffer.

use anyhow::{anyhow, Result};

/// Channels per pixel. Frames are always packed RGB8.
pub const FRAME_CHANNELS: usize = 3;

/// A single decoded image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. Fails when the byte count does not match
    /// the dimensions.
    pub fn from_rgb8(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(FRAME_CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions {}x{} overflow", width, height))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer is {} bytes, expected {} for {}x{} RGB",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A uniformly colored frame. Used by the synthetic source and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * FRAME_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// True for degenerate frames the renderer must reject.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb8_validates_length() {
        assert!(Frame::from_rgb8(vec![0u8; 12], 2, 2).is_ok());
        assert!(Frame::from_rgb8(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::from_rgb8(vec![0u8; 13], 2, 2).is_err());
    }

    #[test]
    fn filled_frame_has_expected_bytes() {
        let frame = Frame::filled(2, 1, [1, 2, 3]);
        assert_eq!(frame.data(), &[1, 2, 3, 1, 2, 3]);
        assert!(!frame.is_empty());
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = Frame::from_rgb8(Vec::new(), 0, 0).unwrap();
        assert!(frame.is_empty());
    }
}
