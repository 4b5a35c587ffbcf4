//! Detection loop controller.
//!
//! One sequential loop drives capture, inference, and render per tick, on
//! two independent cadences: every tick with a frame renders and presents,
//! while the classifier only runs when the detection interval has elapsed.
//! That decoupling is what keeps the display smooth while inference stays
//! cheap.
//!
//! Per-tick classifier and renderer failures are logged and skipped; only
//! frame-source failures end the loop. Shutdown is cooperative: the stop
//! flag is observed at the top of each tick, and camera resources are
//! released on every exit path.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;

use crate::classify::Classifier;
use crate::display::{DisplaySink, KeyEvent};
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::history::{DetectionHistory, DetectionSample};
use crate::ingest::FrameSource;
use crate::overlay::{OverlayConfig, OverlayRenderer};
use crate::shared::SharedSlot;
use crate::smooth::{smooth, SmoothedDetection};

/// Loop cadences and snapshot destination.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Minimum spacing between classifier invocations.
    pub detection_interval: Duration,
    /// Trailing window the smoother aggregates over.
    pub smoothing_window: Duration,
    /// Ring capacity of the detection history.
    pub history_capacity: usize,
    /// Sleep when the source has no frame yet.
    pub idle_poll: Duration,
    /// Where `SaveFrame` snapshots land.
    pub snapshot_dir: PathBuf,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            detection_interval: Duration::from_millis(500),
            smoothing_window: Duration::from_millis(2000),
            history_capacity: 10,
            idle_poll: Duration::from_millis(10),
            snapshot_dir: PathBuf::from("."),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Spaces classifier invocations at least `interval` apart.
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when a new invocation is due at `now`; records the firing.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Counters reported when the loop stops.
#[derive(Clone, Debug, Default)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_rendered: u64,
    pub inferences: u64,
    pub recovered_errors: u64,
    pub snapshots_saved: u64,
    /// Frames presented per second, measured over the last full second.
    pub fps: f32,
}

pub struct DetectionLoop {
    config: LoopConfig,
    overlay: OverlayRenderer,
    source: Box<dyn FrameSource>,
    classifier: Box<dyn Classifier>,
    sink: Box<dyn DisplaySink>,
    history: DetectionHistory,
    throttle: Throttle,
    state: LoopState,
    stop: Arc<AtomicBool>,
    frame_slot: SharedSlot<Frame>,
    detection_slot: SharedSlot<SmoothedDetection>,
    stats: LoopStats,
    last_health_log: Instant,
}

impl DetectionLoop {
    pub fn new(
        config: LoopConfig,
        overlay_config: OverlayConfig,
        source: Box<dyn FrameSource>,
        classifier: Box<dyn Classifier>,
        sink: Box<dyn DisplaySink>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let history = DetectionHistory::with_capacity(config.history_capacity);
        let throttle = Throttle::new(config.detection_interval);
        Self {
            config,
            overlay: OverlayRenderer::new(overlay_config),
            source,
            classifier,
            sink,
            history,
            throttle,
            state: LoopState::Idle,
            stop,
            frame_slot: SharedSlot::new(),
            detection_slot: SharedSlot::new(),
            stats: LoopStats::default(),
            last_health_log: Instant::now(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Last rendered frame, for observers outside the loop.
    pub fn frame_slot(&self) -> SharedSlot<Frame> {
        self.frame_slot.clone()
    }

    /// Last smoothed detection, for observers outside the loop.
    pub fn detection_slot(&self) -> SharedSlot<SmoothedDetection> {
        self.detection_slot.clone()
    }

    /// Idle → Running. Both collaborators must come up; a failed start
    /// releases whatever was acquired and returns to Idle.
    fn start(&mut self) -> Result<(), PipelineError> {
        if let Err(e) = self.source.start() {
            self.state = LoopState::Idle;
            return Err(PipelineError::SourceUnavailable(e.to_string()));
        }
        if !self.classifier.is_ready() {
            self.source.stop();
            self.state = LoopState::Idle;
            return Err(PipelineError::ModelUnavailable(format!(
                "{} classifier reported not ready",
                self.classifier.name()
            )));
        }
        self.state = LoopState::Running;
        log::info!(
            "detection loop running: source={} classifier={} sink={}",
            self.source.name(),
            self.classifier.name(),
            self.sink.name()
        );
        Ok(())
    }

    /// Run until the stop flag is set or the source fails.
    ///
    /// Resources are released on every exit path, error or not.
    pub fn run(&mut self) -> Result<LoopStats, PipelineError> {
        self.start()?;
        let outcome = self.run_ticks();
        self.shutdown();
        outcome.map(|()| self.stats.clone())
    }

    fn run_ticks(&mut self) -> Result<(), PipelineError> {
        let mut fps_window_start = Instant::now();
        let mut fps_frames = 0u32;

        while !self.stop.load(Ordering::SeqCst) {
            self.stats.ticks += 1;

            let frame = match self.source.latest_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    std::thread::sleep(self.config.idle_poll);
                    continue;
                }
                // Source failures are the only fatal per-tick outcome.
                Err(e) => return Err(PipelineError::SourceUnavailable(e.to_string())),
            };

            let now = Instant::now();
            if self.throttle.ready(now) {
                match self.classifier.predict(&frame) {
                    Ok(prediction) => {
                        self.history.append(DetectionSample::new(
                            prediction.label,
                            prediction.confidence,
                            now,
                        ));
                        self.stats.inferences += 1;
                    }
                    Err(e) => {
                        let err = PipelineError::InferenceError(e.to_string());
                        log::warn!("{}; keeping previous detections this tick", err);
                        self.stats.recovered_errors += 1;
                    }
                }
            }

            // Render cadence is independent of inference cadence: the
            // smoothed value is recomputed and drawn on every frame.
            let smoothed = smooth(&self.history, now, self.config.smoothing_window);
            self.detection_slot.publish(smoothed.clone());

            fps_frames += 1;
            let window_elapsed = fps_window_start.elapsed();
            if window_elapsed >= Duration::from_secs(1) {
                self.stats.fps = fps_frames as f32 / window_elapsed.as_secs_f32();
                fps_frames = 0;
                fps_window_start = Instant::now();
            }

            let rendered = match self.overlay.render(&frame, &smoothed, self.stats.fps) {
                Ok(rendered) => rendered,
                Err(e) => {
                    log::warn!("render skipped this tick: {}", e);
                    self.stats.recovered_errors += 1;
                    continue;
                }
            };

            match self.sink.present(&rendered) {
                Ok(()) => self.stats.frames_rendered += 1,
                Err(e) => {
                    let err = PipelineError::RenderError(e.to_string());
                    log::warn!("{}; frame dropped", err);
                    self.stats.recovered_errors += 1;
                }
            }
            self.frame_slot.publish(rendered.clone());

            match self.sink.poll_key() {
                Some(KeyEvent::Quit) => {
                    log::info!("quit requested from display");
                    self.stop.store(true, Ordering::SeqCst);
                }
                Some(KeyEvent::SaveFrame) => match self.save_snapshot(&rendered) {
                    Ok(path) => {
                        self.stats.snapshots_saved += 1;
                        log::info!("frame saved to {}", path.display());
                    }
                    Err(e) => log::warn!("snapshot failed: {}", e),
                },
                None => {}
            }

            if self.last_health_log.elapsed() >= Duration::from_secs(5) {
                log::info!(
                    "health: source_ok={} ticks={} rendered={} inferences={} fps={:.1}",
                    self.source.is_healthy(),
                    self.stats.ticks,
                    self.stats.frames_rendered,
                    self.stats.inferences,
                    self.stats.fps
                );
                self.last_health_log = Instant::now();
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state = LoopState::Stopping;
        self.source.stop();
        self.state = LoopState::Stopped;
        log::info!(
            "detection loop stopped: {} ticks, {} frames, {} inferences, {} recovered errors",
            self.stats.ticks,
            self.stats.frames_rendered,
            self.stats.inferences,
            self.stats.recovered_errors
        );
    }

    fn save_snapshot(&self, frame: &Frame) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.snapshot_dir).with_context(|| {
            format!(
                "failed to create snapshot dir {}",
                self.config.snapshot_dir.display()
            )
        })?;
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let path = self.config.snapshot_dir.join(format!("camspot_{}.jpg", stamp));
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new(&mut writer)
            .encode(
                frame.data(),
                frame.width(),
                frame.height(),
                image::ExtendedColorType::Rgb8,
            )
            .context("jpeg encode failed")?;
        Ok(path)
    }
}
