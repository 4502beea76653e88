//! Video frame sources and the sampling/aggregation pipeline.
//!
//! Sources yield decoded RGB frames in order:
//! - `stub://<frames>` paths produce synthetic frames (tests, dry runs)
//! - in-memory frame lists (tests)
//! - local video files decoded with FFmpeg (feature: video-ffmpeg)

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg;
mod sampler;
mod summary;

pub use sampler::{FrameRecord, SamplingPlan, VideoAnalysis, VideoSampler};
pub use summary::{trim_evenly, Verdict, VideoSummary};

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{anyhow, Result};
use image::RgbImage;

#[cfg(feature = "video-ffmpeg")]
use self::ffmpeg::FfmpegVideo;

/// Paths with this prefix open a synthetic source of `<frames>` frames.
pub const STUB_VIDEO_SCHEME: &str = "stub://";

const SYNTHETIC_WIDTH: u32 = 64;
const SYNTHETIC_HEIGHT: u32 = 48;

/// Sequential source of decoded frames.
pub struct VideoSource {
    backend: VideoBackend,
    frames_decoded: u64,
    source: String,
}

enum VideoBackend {
    Memory(VecDeque<RgbImage>),
    Synthetic(SyntheticVideo),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegVideo),
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct VideoStats {
    pub frames_decoded: u64,
    pub source: String,
}

impl VideoSource {
    /// Open a local video file (or a `stub://` synthetic source).
    pub fn open(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        if let Some(count) = source.strip_prefix(STUB_VIDEO_SCHEME) {
            let total: u64 = count
                .parse()
                .map_err(|_| anyhow!("synthetic video path must be stub://<frames>"))?;
            log::info!("VideoSource: opened {} (synthetic)", source);
            return Ok(Self {
                backend: VideoBackend::Synthetic(SyntheticVideo::new(total)),
                frames_decoded: 0,
                source,
            });
        }

        #[cfg(feature = "video-ffmpeg")]
        {
            let video = FfmpegVideo::open(path)?;
            log::info!("VideoSource: opened {} (ffmpeg)", source);
            Ok(Self {
                backend: VideoBackend::Ffmpeg(video),
                frames_decoded: 0,
                source,
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!(
                "video decoding requires the video-ffmpeg feature ({})",
                source
            ))
        }
    }

    /// Serve a fixed list of frames.
    pub fn from_frames(frames: Vec<RgbImage>) -> Self {
        Self {
            backend: VideoBackend::Memory(frames.into()),
            frames_decoded: 0,
            source: "memory".to_string(),
        }
    }

    /// Next frame, or `None` once the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = match &mut self.backend {
            VideoBackend::Memory(frames) => frames.pop_front(),
            VideoBackend::Synthetic(video) => video.next_frame(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(video) => video.next_frame()?,
        };
        if frame.is_some() {
            self.frames_decoded += 1;
        }
        Ok(frame)
    }

    pub fn stats(&self) -> VideoStats {
        VideoStats {
            frames_decoded: self.frames_decoded,
            source: self.source.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticVideo {
    total: u64,
    emitted: u64,
}

impl SyntheticVideo {
    fn new(total: u64) -> Self {
        Self { total, emitted: 0 }
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        if self.emitted >= self.total {
            return None;
        }
        let shift = self.emitted;
        self.emitted += 1;
        Some(RgbImage::from_fn(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, |x, y| {
            let base = (x as u64 + y as u64 + shift) % 256;
            image::Rgb([base as u8, (base / 2) as u8, 255 - base as u8])
        }))
    }
}
