//! Camera source backed by a `libcamera-vid` subprocess.
//!
//! The subprocess streams MJPEG to stdout; a reader thread splits the byte
//! stream on JPEG markers, decodes each frame, and publishes it into a
//! single-slot cell. The loop polls the slot and never blocks on the
//! camera. Stopping terminates the child; dropping the source stops it too.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;
use crate::ingest::{CameraSettings, FrameSource};
use crate::shared::SharedSlot;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const READ_CHUNK: usize = 64 * 1024;
// A stalled decoder must not buffer unbounded camera output.
const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Configuration for the libcamera subprocess source.
#[derive(Clone, Debug)]
pub struct LibcameraConfig {
    pub settings: CameraSettings,
    /// Capture binary, normally `libcamera-vid`.
    pub binary: String,
}

impl Default for LibcameraConfig {
    fn default() -> Self {
        Self {
            settings: CameraSettings::default(),
            binary: "libcamera-vid".to_string(),
        }
    }
}

pub struct LibcameraSource {
    config: LibcameraConfig,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    latest: SharedSlot<Frame>,
    running: Arc<AtomicBool>,
}

impl LibcameraSource {
    pub fn new(config: LibcameraConfig) -> Self {
        Self {
            config,
            child: None,
            reader: None,
            latest: SharedSlot::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Probe for the capture binary before spawning it.
    fn binary_available(&self) -> bool {
        Command::new("which")
            .arg(&self.config.binary)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn spawn_capture(&mut self) -> Result<()> {
        let settings = &self.config.settings;
        let mut child = Command::new(&self.config.binary)
            .args([
                "--width",
                &settings.width.to_string(),
                "--height",
                &settings.height.to_string(),
                "--framerate",
                &settings.fps.to_string(),
                "--codec",
                "mjpeg",
                "--timeout",
                "0",
                "--nopreview",
                "--output",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.config.binary))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("{} produced no stdout pipe", self.config.binary))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let slot = self.latest.clone();
        let reader = std::thread::spawn(move || read_mjpeg_stream(stdout, slot, running));

        self.child = Some(child);
        self.reader = Some(reader);
        Ok(())
    }
}

impl FrameSource for LibcameraSource {
    fn name(&self) -> &'static str {
        "libcamera"
    }

    fn start(&mut self) -> Result<()> {
        if !self.binary_available() {
            return Err(anyhow!(
                "{} not found; install libcamera tools or use a stub:// source",
                self.config.binary
            ));
        }
        self.spawn_capture()?;
        log::info!(
            "camera started: {}x{} @ {}fps (mjpeg via {})",
            self.config.settings.width,
            self.config.settings.height,
            self.config.settings.fps,
            self.config.binary
        );
        Ok(())
    }

    fn latest_frame(&mut self) -> Result<Option<Frame>> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(anyhow!("camera stream ended"));
        }
        Ok(self.latest.take())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }

    fn is_healthy(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for LibcameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_mjpeg_stream(mut stdout: impl Read, slot: SharedSlot<Frame>, running: Arc<AtomicBool>) {
    let mut pending: Vec<u8> = Vec::with_capacity(READ_CHUNK * 4);
    let mut chunk = vec![0u8; READ_CHUNK];
    while running.load(Ordering::SeqCst) {
        let n = match stdout.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::warn!("camera stream read failed: {}", e);
                break;
            }
        };
        pending.extend_from_slice(&chunk[..n]);
        while let Some(jpeg) = extract_jpeg(&mut pending) {
            match decode_jpeg(&jpeg) {
                Ok(frame) => slot.publish(frame),
                Err(e) => log::debug!("dropping undecodable frame: {}", e),
            }
        }
        if pending.len() > MAX_PENDING_BYTES {
            log::warn!("camera buffer overran, discarding {} bytes", pending.len());
            pending.clear();
        }
    }
    running.store(false, Ordering::SeqCst);
}

/// Pull one complete JPEG (SOI..EOI inclusive) off the front of `pending`.
///
/// Bytes before the first SOI marker are discarded.
fn extract_jpeg(pending: &mut Vec<u8>) -> Option<Vec<u8>> {
    let soi = find_marker(pending, JPEG_SOI, 0)?;
    if soi > 0 {
        pending.drain(..soi);
    }
    let eoi = find_marker(pending, JPEG_EOI, JPEG_SOI.len())?;
    let end = eoi + JPEG_EOI.len();
    let jpeg = pending[..end].to_vec();
    pending.drain(..end);
    Some(jpeg)
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if haystack.len() < from + 2 {
        return None;
    }
    (from..haystack.len() - 1).find(|&i| haystack[i] == marker[0] && haystack[i + 1] == marker[1])
}

fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .context("jpeg decode failed")?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::from_rgb8(rgb.into_raw(), width, height)
}
