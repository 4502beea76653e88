use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::video::SamplingPlan;

const DEFAULT_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DATA_DIR: &str = ".";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_MODEL_PATH: &str = "model.onnx";
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_CONFIDENCE: f32 = 0.4;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    addr: Option<String>,
    data_dir: Option<PathBuf>,
    max_upload_bytes: Option<usize>,
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    input_size: Option<u32>,
    iou_threshold: Option<f32>,
    label_font: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    frame_stride: Option<u64>,
    max_sampled_frames: Option<u64>,
    max_display_frames: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub model: ModelSettings,
    pub confidence: f32,
    pub sampling: SamplingPlan,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX model file, or `stub://...` for the stub backend.
    pub path: String,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub label_font: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_MODEL_PATH.to_string(),
            input_size: DEFAULT_MODEL_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            label_font: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            model: ModelSettings::default(),
            confidence: DEFAULT_CONFIDENCE,
            sampling: SamplingPlan::default(),
        }
    }
}

impl AppConfig {
    /// Load from the file named by `DROWNING_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DROWNING_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit config file (if any), then apply environment
    /// overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = Self::default();
        let model = file.model.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        Self {
            addr: file.addr.unwrap_or(defaults.addr),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            max_upload_bytes: file.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            model: ModelSettings {
                path: model.path.unwrap_or(defaults.model.path),
                input_size: model.input_size.unwrap_or(defaults.model.input_size),
                iou_threshold: model.iou_threshold.unwrap_or(defaults.model.iou_threshold),
                label_font: model.label_font,
            },
            confidence: file
                .detection
                .and_then(|detection| detection.confidence)
                .unwrap_or(defaults.confidence),
            sampling: SamplingPlan {
                frame_stride: video.frame_stride.unwrap_or(defaults.sampling.frame_stride),
                max_sampled_frames: video
                    .max_sampled_frames
                    .unwrap_or(defaults.sampling.max_sampled_frames),
                max_display_frames: video
                    .max_display_frames
                    .unwrap_or(defaults.sampling.max_display_frames),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = non_empty_env("DROWNING_ADDR") {
            self.addr = addr;
        }
        if let Some(dir) = non_empty_env("DROWNING_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty_env("DROWNING_MODEL_PATH") {
            self.model.path = path;
        }
        if let Some(font) = non_empty_env("DROWNING_LABEL_FONT") {
            self.model.label_font = Some(PathBuf::from(font));
        }
        if let Some(confidence) = non_empty_env("DROWNING_CONFIDENCE") {
            self.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("DROWNING_CONFIDENCE must be a number between 0 and 1"))?;
        }
        if let Some(stride) = non_empty_env("DROWNING_FRAME_STRIDE") {
            self.sampling.frame_stride = stride
                .parse()
                .map_err(|_| anyhow!("DROWNING_FRAME_STRIDE must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(anyhow!(
                "detection confidence must be in (0, 1], got {}",
                self.confidence
            ));
        }
        if !(self.model.iou_threshold > 0.0 && self.model.iou_threshold <= 1.0) {
            return Err(anyhow!(
                "model iou_threshold must be in (0, 1], got {}",
                self.model.iou_threshold
            ));
        }
        if self.model.input_size == 0 {
            return Err(anyhow!("model input_size must be greater than zero"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.sampling.frame_stride == 0 {
            return Err(anyhow!("video frame_stride must be greater than zero"));
        }
        if self.sampling.max_sampled_frames == 0 || self.sampling.max_display_frames == 0 {
            return Err(anyhow!("video frame caps must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
