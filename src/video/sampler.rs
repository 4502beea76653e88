use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detect::{Detection, MediaDetector};
use crate::error::VideoError;
use crate::storage::MediaStore;
use crate::video::summary::{trim_evenly, VideoSummary};
use crate::video::VideoSource;

/// How a video is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Sample frames whose index is a multiple of this.
    pub frame_stride: u64,
    /// Upper bound on sampled frames; decoding stops at
    /// `max_sampled_frames * frame_stride`.
    pub max_sampled_frames: u64,
    /// Frame records kept for display after sampling.
    pub max_display_frames: usize,
}

impl Default for SamplingPlan {
    fn default() -> Self {
        Self {
            frame_stride: 120,
            max_sampled_frames: 50,
            max_display_frames: 10,
        }
    }
}

impl SamplingPlan {
    /// Frame index at which decoding stops.
    pub fn frame_cap(&self) -> u64 {
        self.max_sampled_frames.saturating_mul(self.frame_stride)
    }
}

/// One sampled and analyzed frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    /// Filename inside `frames/<video_id>/`.
    pub original_frame: String,
    /// Filename inside `results/`.
    pub result_frame: String,
    pub detections: Vec<Detection>,
}

impl FrameRecord {
    pub fn drowning_detected(&self) -> bool {
        self.detections.iter().any(Detection::is_drowning)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VideoAnalysis {
    pub frames: Vec<FrameRecord>,
    pub summary: VideoSummary,
}

/// Samples a video at a fixed stride and runs the single-media detector on
/// each sampled frame.
pub struct VideoSampler<'a> {
    detector: &'a mut MediaDetector,
    store: &'a MediaStore,
    plan: SamplingPlan,
}

impl<'a> VideoSampler<'a> {
    pub fn new(detector: &'a mut MediaDetector, store: &'a MediaStore, plan: SamplingPlan) -> Self {
        Self {
            detector,
            store,
            plan,
        }
    }

    /// Open and analyze a video file.
    pub fn process_video(
        &mut self,
        path: &Path,
        confidence: f32,
    ) -> Result<VideoAnalysis, VideoError> {
        log::info!("processing video {}", path.display());
        let mut source = VideoSource::open(path).map_err(|err| {
            log::warn!("could not open video {}: {:#}", path.display(), err);
            VideoError::Open(format!("{:#}", err))
        })?;
        self.process_source(&mut source, confidence)
    }

    /// Analyze frames from an already opened source.
    pub fn process_source(
        &mut self,
        source: &mut VideoSource,
        confidence: f32,
    ) -> Result<VideoAnalysis, VideoError> {
        let (video_id, frame_dir) = self.store.create_frame_dir().map_err(VideoError::Scratch)?;
        let stride = self.plan.frame_stride.max(1);
        let frame_cap = self.plan.frame_cap();

        let mut frames = Vec::new();
        let mut index = 0u64;
        while index < frame_cap {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    log::warn!("video decode stopped at frame {}: {:#}", index, err);
                    break;
                }
            };

            if index % stride == 0 {
                if let Some(record) = self.sample_frame(index, &frame, &frame_dir, confidence) {
                    frames.push(record);
                }
            }
            index += 1;
        }
        let frame_limit_reached = index >= frame_cap;

        let sampled = frames.len();
        let frames = trim_evenly(frames, self.plan.max_display_frames);
        let summary = VideoSummary::from_frames(&frames, &video_id, frame_limit_reached);
        log::info!(
            "video {}: decoded={} sampled={} kept={} verdict={} confidence={:.1}",
            video_id,
            source.stats().frames_decoded,
            sampled,
            frames.len(),
            summary.final_prediction.as_str(),
            summary.confidence_level
        );

        Ok(VideoAnalysis { frames, summary })
    }

    fn sample_frame(
        &mut self,
        index: u64,
        frame: &RgbImage,
        frame_dir: &Path,
        confidence: f32,
    ) -> Option<FrameRecord> {
        if frame.width() == 0 || frame.height() == 0 {
            log::warn!("invalid or empty frame at {}", index);
            return None;
        }

        let original_frame = format!("frame_{:06}.jpg", index);
        let frame_path = frame_dir.join(&original_frame);
        if let Err(err) = frame.save(&frame_path) {
            log::warn!("failed to save frame {}: {}", index, err);
            return None;
        }
        let written = std::fs::metadata(&frame_path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !written {
            log::warn!("failed to save frame {}: file missing or empty", index);
            return None;
        }

        match self.detector.detect_image(&frame_path, confidence) {
            Ok(analysis) => Some(FrameRecord {
                frame_number: index,
                original_frame,
                result_frame: analysis.result_filename,
                detections: analysis.detections,
            }),
            Err(err) => {
                log::warn!("failed to process frame {}: {}", index, err);
                None
            }
        }
    }
}
