//! End-to-end detection loop tests against in-process collaborators.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use camspot::classify::{Classifier, Prediction, StubClassifier};
use camspot::display::{DisplaySink, KeyEvent};
use camspot::ingest::FrameSource;
use camspot::overlay::OverlayConfig;
use camspot::runner::{DetectionLoop, LoopConfig, LoopState};
use camspot::{Frame, PipelineError};

/// Unpaced source: every poll yields a fresh frame. Records lifecycle
/// calls so tests can assert cleanup happened after the loop is dropped
/// from reach.
struct TestSource {
    started: bool,
    frames: u64,
    fail_after: Option<u64>,
    stopped: Arc<AtomicBool>,
}

impl TestSource {
    fn new(stopped: Arc<AtomicBool>) -> Self {
        Self {
            started: false,
            frames: 0,
            fail_after: None,
            stopped,
        }
    }

    fn failing_after(stopped: Arc<AtomicBool>, frames: u64) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::new(stopped)
        }
    }
}

impl FrameSource for TestSource {
    fn name(&self) -> &'static str {
        "test"
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn latest_frame(&mut self) -> Result<Option<Frame>> {
        if !self.started {
            return Err(anyhow!("polled before start"));
        }
        if let Some(limit) = self.fail_after {
            if self.frames >= limit {
                return Err(anyhow!("camera went away"));
            }
        }
        self.frames += 1;
        // Vary one byte so the stub classifier sees scene changes.
        let mut data = vec![0u8; 32 * 24 * 3];
        data[0] = (self.frames % 256) as u8;
        Ok(Some(Frame::from_rgb8(data, 32, 24)?))
    }

    fn stop(&mut self) {
        self.started = false;
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_healthy(&self) -> bool {
        self.started
    }
}

struct BrokenSource;

impl FrameSource for BrokenSource {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn start(&mut self) -> Result<()> {
        Err(anyhow!("device busy"))
    }

    fn latest_frame(&mut self) -> Result<Option<Frame>> {
        Err(anyhow!("never started"))
    }

    fn stop(&mut self) {}

    fn is_healthy(&self) -> bool {
        false
    }
}

struct NeverReadyClassifier;

impl Classifier for NeverReadyClassifier {
    fn name(&self) -> &'static str {
        "never-ready"
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn predict(&mut self, _frame: &Frame) -> Result<Prediction> {
        Err(anyhow!("model not loaded"))
    }
}

/// Counts presents and emits scripted key events.
struct ScriptedSink {
    presented: Arc<AtomicU64>,
    quit_after: u64,
    save_on_present: Option<u64>,
}

impl ScriptedSink {
    fn quit_after(presented: Arc<AtomicU64>, quit_after: u64) -> Self {
        Self {
            presented,
            quit_after,
            save_on_present: None,
        }
    }
}

impl DisplaySink for ScriptedSink {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyEvent> {
        let presented = self.presented.load(Ordering::SeqCst);
        if let Some(at) = self.save_on_present {
            if presented == at {
                self.save_on_present = None;
                return Some(KeyEvent::SaveFrame);
            }
        }
        if presented >= self.quit_after {
            Some(KeyEvent::Quit)
        } else {
            None
        }
    }
}

fn fast_config() -> LoopConfig {
    LoopConfig {
        detection_interval: Duration::from_millis(5),
        smoothing_window: Duration::from_millis(500),
        history_capacity: 10,
        idle_poll: Duration::from_millis(1),
        snapshot_dir: std::env::temp_dir(),
    }
}

fn build_loop(
    config: LoopConfig,
    source: Box<dyn FrameSource>,
    classifier: Box<dyn Classifier>,
    sink: Box<dyn DisplaySink>,
    stop: Arc<AtomicBool>,
) -> DetectionLoop {
    DetectionLoop::new(config, OverlayConfig::default(), source, classifier, sink, stop)
}

#[test]
fn runs_until_quit_and_releases_the_source() {
    let stopped = Arc::new(AtomicBool::new(false));
    let presented = Arc::new(AtomicU64::new(0));
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(TestSource::new(stopped.clone())),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(ScriptedSink::quit_after(presented.clone(), 5)),
        Arc::new(AtomicBool::new(false)),
    );

    let stats = detection_loop.run().expect("loop should stop cleanly");

    assert_eq!(detection_loop.state(), LoopState::Stopped);
    assert!(stats.frames_rendered >= 5);
    assert!(stats.inferences >= 1);
    assert!(stopped.load(Ordering::SeqCst), "source must be stopped");
    // Observers see the last smoothed detection and rendered frame.
    assert!(detection_loop.detection_slot().take().is_some());
    assert!(detection_loop.frame_slot().take().is_some());
}

#[test]
fn inference_is_throttled_below_the_render_rate() {
    let stopped = Arc::new(AtomicBool::new(false));
    let presented = Arc::new(AtomicU64::new(0));
    let config = LoopConfig {
        detection_interval: Duration::from_millis(250),
        ..fast_config()
    };
    let mut detection_loop = build_loop(
        config,
        Box::new(TestSource::new(stopped)),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(ScriptedSink::quit_after(presented, 50)),
        Arc::new(AtomicBool::new(false)),
    );

    let stats = detection_loop.run().unwrap();

    assert!(stats.frames_rendered >= 50);
    assert!(
        stats.inferences < stats.frames_rendered,
        "expected fewer inferences ({}) than rendered frames ({})",
        stats.inferences,
        stats.frames_rendered
    );
}

#[test]
fn failed_source_start_leaves_the_loop_idle() {
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(BrokenSource),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(ScriptedSink::quit_after(Arc::new(AtomicU64::new(0)), 1)),
        Arc::new(AtomicBool::new(false)),
    );

    let err = detection_loop.run().unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert_eq!(detection_loop.state(), LoopState::Idle);
}

#[test]
fn unready_classifier_aborts_startup_and_stops_the_source() {
    let stopped = Arc::new(AtomicBool::new(false));
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(TestSource::new(stopped.clone())),
        Box::new(NeverReadyClassifier),
        Box::new(ScriptedSink::quit_after(Arc::new(AtomicU64::new(0)), 1)),
        Arc::new(AtomicBool::new(false)),
    );

    let err = detection_loop.run().unwrap_err();
    assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    assert_eq!(detection_loop.state(), LoopState::Idle);
    assert!(stopped.load(Ordering::SeqCst), "source must be released");
}

#[test]
fn preset_stop_flag_exits_before_any_frame() {
    let stopped = Arc::new(AtomicBool::new(false));
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(TestSource::new(stopped.clone())),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(ScriptedSink::quit_after(Arc::new(AtomicU64::new(0)), 1)),
        Arc::new(AtomicBool::new(true)),
    );

    let stats = detection_loop.run().unwrap();
    assert_eq!(detection_loop.state(), LoopState::Stopped);
    assert_eq!(stats.frames_rendered, 0);
    assert!(stopped.load(Ordering::SeqCst));
}

#[test]
fn source_failure_mid_run_is_fatal_but_still_cleans_up() {
    let stopped = Arc::new(AtomicBool::new(false));
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(TestSource::failing_after(stopped.clone(), 3)),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(ScriptedSink::quit_after(Arc::new(AtomicU64::new(0)), u64::MAX)),
        Arc::new(AtomicBool::new(false)),
    );

    let err = detection_loop.run().unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert!(err.is_fatal());
    assert_eq!(detection_loop.state(), LoopState::Stopped);
    assert!(stopped.load(Ordering::SeqCst));
}

/// Thread-affine sink, like a real platform window. Deliberately `!Send`
/// (it holds an `Rc`) to pin down that the loop never requires its sink
/// to cross threads.
struct ThreadBoundSink {
    presented: Rc<Cell<u64>>,
    quit_after: u64,
}

impl DisplaySink for ThreadBoundSink {
    fn name(&self) -> &'static str {
        "thread-bound"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        self.presented.set(self.presented.get() + 1);
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyEvent> {
        if self.presented.get() >= self.quit_after {
            Some(KeyEvent::Quit)
        } else {
            None
        }
    }
}

#[test]
fn a_non_send_sink_is_accepted() {
    let presented = Rc::new(Cell::new(0u64));
    let sink = ThreadBoundSink {
        presented: presented.clone(),
        quit_after: 3,
    };
    let mut detection_loop = build_loop(
        fast_config(),
        Box::new(TestSource::new(Arc::new(AtomicBool::new(false)))),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(sink),
        Arc::new(AtomicBool::new(false)),
    );

    let stats = detection_loop.run().unwrap();
    assert_eq!(detection_loop.state(), LoopState::Stopped);
    assert!(stats.frames_rendered >= 3);
    assert!(presented.get() >= 3);
}

#[test]
fn save_key_writes_a_snapshot() {
    let snapshot_dir = tempfile::tempdir().unwrap();
    let config = LoopConfig {
        snapshot_dir: snapshot_dir.path().to_path_buf(),
        ..fast_config()
    };
    let presented = Arc::new(AtomicU64::new(0));
    let sink = ScriptedSink {
        presented: presented.clone(),
        quit_after: 4,
        save_on_present: Some(2),
    };
    let mut detection_loop = build_loop(
        config,
        Box::new(TestSource::new(Arc::new(AtomicBool::new(false)))),
        Box::new(StubClassifier::with_default_labels()),
        Box::new(sink),
        Arc::new(AtomicBool::new(false)),
    );

    let stats = detection_loop.run().unwrap();
    assert_eq!(stats.snapshots_saved, 1);

    let saved: Vec<_> = std::fs::read_dir(snapshot_dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("camspot_") && saved[0].ends_with(".jpg"));
}
