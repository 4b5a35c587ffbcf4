use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SOURCE_URL: &str = "stub://front_camera";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_DETECTION_INTERVAL_MS: u64 = 500;
const DEFAULT_HISTORY_CAPACITY: usize = 10;
const DEFAULT_SMOOTHING_WINDOW_MS: u64 = 2000;
const DEFAULT_IDLE_POLL_MS: u64 = 10;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_BAND_HIGH: f32 = 0.7;
const DEFAULT_BAND_MEDIUM: f32 = 0.5;
const DEFAULT_MODEL_PATH: &str = "model/model.onnx";
const DEFAULT_LABELS_PATH: &str = "model/labels.txt";
const DEFAULT_SNAPSHOT_DIR: &str = ".";

#[derive(Debug, Deserialize, Default)]
struct CamspotConfigFile {
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
    overlay: Option<OverlayConfigFile>,
    snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    interval_ms: Option<u64>,
    history_capacity: Option<usize>,
    smoothing_window_ms: Option<u64>,
    idle_poll_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    confidence_threshold: Option<f32>,
    band_high: Option<f32>,
    band_medium: Option<f32>,
}

/// Resolved daemon configuration.
///
/// Loaded from the JSON file named by `CAMSPOT_CONFIG`, then overridden by
/// environment variables, then validated.
#[derive(Debug, Clone)]
pub struct CamspotConfig {
    pub camera: CameraSettings,
    pub model: ModelSettings,
    pub detection: DetectionSettings,
    pub overlay: OverlaySettings,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub labels_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub interval: Duration,
    pub history_capacity: usize,
    pub smoothing_window: Duration,
    pub idle_poll: Duration,
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub confidence_threshold: f32,
    pub band_high: f32,
    pub band_medium: f32,
}

impl CamspotConfig {
    /// Load using the `CAMSPOT_CONFIG` file if that variable is set.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CAMSPOT_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit config file path, then apply env overrides
    /// and validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CamspotConfigFile) -> Self {
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
            fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
        };
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|model| model.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            labels_path: file
                .model
                .as_ref()
                .and_then(|model| model.labels_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH)),
        };
        let detection = DetectionSettings {
            interval: Duration::from_millis(
                file.detection
                    .as_ref()
                    .and_then(|detection| detection.interval_ms)
                    .unwrap_or(DEFAULT_DETECTION_INTERVAL_MS),
            ),
            history_capacity: file
                .detection
                .as_ref()
                .and_then(|detection| detection.history_capacity)
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),
            smoothing_window: Duration::from_millis(
                file.detection
                    .as_ref()
                    .and_then(|detection| detection.smoothing_window_ms)
                    .unwrap_or(DEFAULT_SMOOTHING_WINDOW_MS),
            ),
            idle_poll: Duration::from_millis(
                file.detection
                    .as_ref()
                    .and_then(|detection| detection.idle_poll_ms)
                    .unwrap_or(DEFAULT_IDLE_POLL_MS),
            ),
        };
        let overlay = OverlaySettings {
            confidence_threshold: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            band_high: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.band_high)
                .unwrap_or(DEFAULT_BAND_HIGH),
            band_medium: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.band_medium)
                .unwrap_or(DEFAULT_BAND_MEDIUM),
        };
        let snapshot_dir = file
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR));
        Self {
            camera,
            model,
            detection,
            overlay,
            snapshot_dir,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CAMSPOT_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(interval) = std::env::var("CAMSPOT_DETECTION_INTERVAL_MS") {
            let ms: u64 = interval.parse().map_err(|_| {
                anyhow!("CAMSPOT_DETECTION_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.detection.interval = Duration::from_millis(ms);
        }
        if let Ok(threshold) = std::env::var("CAMSPOT_CONFIDENCE_THRESHOLD") {
            let value: f32 = threshold
                .parse()
                .map_err(|_| anyhow!("CAMSPOT_CONFIDENCE_THRESHOLD must be a float"))?;
            self.overlay.confidence_threshold = value;
        }
        if let Ok(dir) = std::env::var("CAMSPOT_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                self.snapshot_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be nonzero"));
        }
        if self.camera.fps == 0 {
            return Err(anyhow!("camera fps must be greater than zero"));
        }
        if self.detection.interval.is_zero() {
            return Err(anyhow!("detection interval must be greater than zero"));
        }
        if self.detection.smoothing_window.is_zero() {
            return Err(anyhow!("smoothing window must be greater than zero"));
        }
        if self.detection.history_capacity == 0 {
            return Err(anyhow!("history capacity must be at least 1"));
        }
        for (name, value) in [
            ("confidence_threshold", self.overlay.confidence_threshold),
            ("band_high", self.overlay.band_high),
            ("band_medium", self.overlay.band_medium),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1]", name));
            }
        }
        if self.overlay.band_medium > self.overlay.band_high {
            return Err(anyhow!("band_medium cannot exceed band_high"));
        }
        Ok(())
    }
}

impl Default for CamspotConfig {
    fn default() -> Self {
        Self::from_file(CamspotConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<CamspotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
