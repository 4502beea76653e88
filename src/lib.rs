//! Drowning Watch
//!
//! Upload an image or a video, run a YOLO-family detector over it and get
//! back an annotated copy plus a verdict.
//!
//! # Pipeline
//!
//! 1. **Single-media detector** (`detect::MediaDetector`): one image in,
//!    labeled boxes drawn on a copy, per-detection records out. Class index 0
//!    is "Drowning"; everything else is "Not Drowning".
//! 2. **Video sampler** (`video::VideoSampler`): decode frames in order,
//!    analyze every Nth one, keep at most ten records for display and
//!    aggregate a verdict with a heuristic confidence.
//!
//! # Module Structure
//!
//! - `config`: file + environment configuration
//! - `detect`: backends, box decoding, annotation, the single-media detector
//! - `video`: frame sources, sampling and the verdict summary
//! - `storage`: on-disk layout for uploads, results and extracted frames
//! - `web`: the blocking HTTP front end and its HTML pages

pub mod config;
pub mod detect;
pub mod error;
pub mod media;
pub mod storage;
pub mod video;
pub mod web;

pub use config::{AppConfig, ModelSettings};
pub use detect::{
    build_backend, Annotator, BoxPrediction, Detection, DetectionClass, DetectorBackend,
    ImageAnalysis, MediaDetector, StubBackend,
};
pub use error::{DetectError, VideoError};
pub use media::MediaKind;
pub use storage::MediaStore;
pub use video::{
    FrameRecord, SamplingPlan, Verdict, VideoAnalysis, VideoSampler, VideoSource, VideoSummary,
};
pub use web::{WebConfig, WebHandle, WebServer};
