//! camspotd - camera detection daemon
//!
//! This daemon:
//! 1. Captures frames from the configured camera (libcamera-vid or synthetic)
//! 2. Classifies frames on a throttled cadence
//! 3. Smooths predictions by majority vote over a trailing window
//! 4. Draws the status overlay on every frame
//! 5. Presents frames to a window (or a null sink when headless)

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;

use camspot::classify::{load_labels, Classifier, StubClassifier};
use camspot::config::CamspotConfig;
use camspot::display::{DisplaySink, NullSink};
use camspot::ingest::{CameraSettings, FrameSource, LibcameraConfig, LibcameraSource, SyntheticSource};
use camspot::overlay::OverlayConfig;
use camspot::runner::{DetectionLoop, LoopConfig};

#[derive(Parser, Debug)]
#[command(name = "camspotd", version, about = "Camera detection daemon")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "CAMSPOT_CONFIG")]
    config: Option<PathBuf>,

    /// Camera URL (stub://<name> for the synthetic source).
    #[arg(long, env = "CAMSPOT_SOURCE_URL")]
    source: Option<String>,

    /// Classifier backend: "stub" or "tract".
    #[arg(long, default_value = "stub")]
    backend: String,

    /// Run without a display window.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = CamspotConfig::load_from(args.config.as_deref())?;
    log::info!("camspotd {} starting", env!("CARGO_PKG_VERSION"));

    let url = args.source.unwrap_or_else(|| config.camera.url.clone());
    let settings = CameraSettings {
        width: config.camera.width,
        height: config.camera.height,
        fps: config.camera.fps,
    };
    let source: Box<dyn FrameSource> = if url.starts_with("stub://") {
        log::info!("using synthetic source for {}", url);
        Box::new(SyntheticSource::new(settings))
    } else {
        Box::new(LibcameraSource::new(LibcameraConfig {
            settings,
            ..LibcameraConfig::default()
        }))
    };

    let labels = match load_labels(&config.model.labels_path) {
        Ok(labels) => labels,
        Err(e) if args.backend == "stub" => {
            log::warn!(
                "labels unavailable ({}); falling back to built-in stub labels",
                e
            );
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let classifier: Box<dyn Classifier> = match args.backend.as_str() {
        "stub" => {
            if labels.is_empty() {
                Box::new(StubClassifier::with_default_labels())
            } else {
                Box::new(StubClassifier::new(labels))
            }
        }
        #[cfg(feature = "backend-tract")]
        "tract" => Box::new(camspot::classify::TractClassifier::new(
            &config.model.path,
            labels,
            config.camera.width,
            config.camera.height,
        )?),
        #[cfg(not(feature = "backend-tract"))]
        "tract" => bail!("tract backend requires building with --features backend-tract"),
        other => bail!("unknown backend: {}", other),
    };

    let sink: Box<dyn DisplaySink> = make_sink(&config, args.headless)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received");
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    let loop_config = LoopConfig {
        detection_interval: config.detection.interval,
        smoothing_window: config.detection.smoothing_window,
        history_capacity: config.detection.history_capacity,
        idle_poll: config.detection.idle_poll,
        snapshot_dir: config.snapshot_dir.clone(),
    };
    let overlay_config = OverlayConfig {
        confidence_threshold: config.overlay.confidence_threshold,
        band_high: config.overlay.band_high,
        band_medium: config.overlay.band_medium,
    };

    let mut detection_loop =
        DetectionLoop::new(loop_config, overlay_config, source, classifier, sink, stop);
    match detection_loop.run() {
        Ok(stats) => {
            log::info!(
                "clean shutdown after {} frames ({} inferences)",
                stats.frames_rendered,
                stats.inferences
            );
            Ok(())
        }
        Err(e) => {
            log::error!("pipeline failed in {}: {}", e.collaborator(), e);
            Err(e.into())
        }
    }
}

#[cfg(feature = "display-minifb")]
fn make_sink(config: &CamspotConfig, headless: bool) -> Result<Box<dyn DisplaySink>> {
    if headless {
        return Ok(Box::new(NullSink::new()));
    }
    let sink =
        camspot::display::MinifbSink::open("camspot", config.camera.width, config.camera.height)?;
    Ok(Box::new(sink))
}

#[cfg(not(feature = "display-minifb"))]
fn make_sink(_config: &CamspotConfig, headless: bool) -> Result<Box<dyn DisplaySink>> {
    if !headless {
        log::warn!("built without display-minifb; running headless");
    }
    Ok(Box::new(NullSink::new()))
}
