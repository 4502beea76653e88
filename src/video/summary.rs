use serde::Serialize;

use crate::video::sampler::FrameRecord;

/// Confidence ceiling when drowning frames were found.
pub const MAX_DROWNING_CONFIDENCE: f64 = 95.0;
/// Confidence when frames were analyzed and none triggered.
pub const NO_DROWNING_CONFIDENCE: f64 = 90.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "DROWNING DETECTED")]
    DrowningDetected,
    #[serde(rename = "NO DROWNING DETECTED")]
    NoDrowningDetected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::DrowningDetected => "DROWNING DETECTED",
            Verdict::NoDrowningDetected => "NO DROWNING DETECTED",
        }
    }
}

/// Aggregate outcome of one video.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoSummary {
    pub total_frames_analyzed: usize,
    pub drowning_frames: usize,
    pub video_id: String,
    pub final_prediction: Verdict,
    /// Percentage, 0 to 95. A heuristic, not a probability.
    pub confidence_level: f64,
    pub frame_limit_reached: bool,
}

impl VideoSummary {
    pub fn from_frames(frames: &[FrameRecord], video_id: &str, frame_limit_reached: bool) -> Self {
        let total_frames_analyzed = frames.len();
        let drowning_frames = frames.iter().filter(|f| f.drowning_detected()).count();

        let (final_prediction, confidence_level) = if total_frames_analyzed == 0 {
            (Verdict::NoDrowningDetected, 0.0)
        } else if drowning_frames == 0 {
            (Verdict::NoDrowningDetected, NO_DROWNING_CONFIDENCE)
        } else {
            let ratio = drowning_frames as f64 / total_frames_analyzed as f64 * 100.0;
            (Verdict::DrowningDetected, ratio.min(MAX_DROWNING_CONFIDENCE))
        };

        Self {
            total_frames_analyzed,
            drowning_frames,
            video_id: video_id.to_string(),
            final_prediction,
            confidence_level,
            frame_limit_reached,
        }
    }
}

/// Reduce `items` to at most `cap` entries by taking every `len / cap`-th
/// item from the start.
pub fn trim_evenly<T>(items: Vec<T>, cap: usize) -> Vec<T> {
    if items.len() <= cap {
        return items;
    }
    if cap == 0 {
        return Vec::new();
    }
    let step = (items.len() / cap).max(1);
    items.into_iter().step_by(step).take(cap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, DetectionClass};

    fn frame(number: u64, drowning: bool) -> FrameRecord {
        let class = if drowning {
            DetectionClass::Drowning
        } else {
            DetectionClass::NotDrowning
        };
        FrameRecord {
            frame_number: number,
            original_frame: format!("frame_{number:06}.jpg"),
            result_frame: format!("result_{number}.jpg"),
            detections: vec![Detection {
                class,
                confidence: 0.8,
            }],
        }
    }

    #[test]
    fn no_frames_means_zero_confidence() {
        let summary = VideoSummary::from_frames(&[], "vid", false);
        assert_eq!(summary.final_prediction, Verdict::NoDrowningDetected);
        assert_eq!(summary.final_prediction.as_str(), "NO DROWNING DETECTED");
        assert_eq!(summary.confidence_level, 0.0);
        assert_eq!(summary.total_frames_analyzed, 0);
    }

    #[test]
    fn all_frames_drowning_is_clamped_to_95() {
        let frames: Vec<_> = (0..4).map(|i| frame(i * 120, true)).collect();
        let summary = VideoSummary::from_frames(&frames, "vid", true);
        assert_eq!(summary.final_prediction, Verdict::DrowningDetected);
        assert_eq!(summary.confidence_level, 95.0);
        assert_eq!(summary.drowning_frames, 4);
        assert!(summary.frame_limit_reached);
    }

    #[test]
    fn quiet_video_reports_90() {
        let frames: Vec<_> = (0..3).map(|i| frame(i * 120, false)).collect();
        let summary = VideoSummary::from_frames(&frames, "vid", false);
        assert_eq!(summary.final_prediction, Verdict::NoDrowningDetected);
        assert_eq!(summary.confidence_level, 90.0);
    }

    #[test]
    fn partial_drowning_uses_ratio() {
        let frames = vec![frame(0, true), frame(120, false), frame(240, false), frame(360, false)];
        let summary = VideoSummary::from_frames(&frames, "vid", false);
        assert_eq!(summary.final_prediction, Verdict::DrowningDetected);
        assert_eq!(summary.confidence_level, 25.0);
        assert_eq!(summary.drowning_frames, 1);
    }

    #[test]
    fn empty_detections_do_not_trigger() {
        let mut quiet = frame(0, false);
        quiet.detections.clear();
        let summary = VideoSummary::from_frames(&[quiet], "vid", false);
        assert_eq!(summary.drowning_frames, 0);
        assert_eq!(summary.confidence_level, 90.0);
    }

    #[test]
    fn verdict_serializes_as_display_string() {
        let summary = VideoSummary::from_frames(&[frame(0, true)], "vid", false);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["final_prediction"], "DROWNING DETECTED");
        assert_eq!(json["video_id"], "vid");
    }

    #[test]
    fn trim_keeps_short_lists() {
        assert_eq!(trim_evenly(vec![1, 2, 3], 10), vec![1, 2, 3]);
    }

    #[test]
    fn trim_uses_uniform_step() {
        let items: Vec<u32> = (0..25).collect();
        // step = 25 / 10 = 2
        assert_eq!(
            trim_evenly(items, 10),
            vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]
        );
        let items: Vec<u32> = (0..50).collect();
        assert_eq!(
            trim_evenly(items, 10),
            vec![0, 5, 10, 15, 20, 25, 30, 35, 40, 45]
        );
    }

    #[test]
    fn trim_never_exceeds_cap() {
        for len in 0..120 {
            let items: Vec<usize> = (0..len).collect();
            assert!(trim_evenly(items, 10).len() <= 10);
        }
        assert!(trim_evenly(vec![1, 2], 0).is_empty());
    }
}
