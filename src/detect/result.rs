use std::path::PathBuf;

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Model class index that marks the target condition.
pub const DROWNING_CLASS_INDEX: usize = 0;

/// Binary classification of a detected region.
///
/// Index 0 is the target condition; every other model class collapses into
/// `NotDrowning`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionClass {
    #[serde(rename = "Drowning")]
    Drowning,
    #[serde(rename = "Not Drowning")]
    NotDrowning,
}

impl DetectionClass {
    pub fn from_class_index(class_index: usize) -> Self {
        if class_index == DROWNING_CLASS_INDEX {
            Self::Drowning
        } else {
            Self::NotDrowning
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Drowning => "Drowning",
            Self::NotDrowning => "Not Drowning",
        }
    }

    /// Overlay color: blue for the target condition, green otherwise.
    pub fn color(&self) -> Rgb<u8> {
        match self {
            Self::Drowning => Rgb([0, 0, 255]),
            Self::NotDrowning => Rgb([0, 255, 0]),
        }
    }
}

/// Per-region record returned to callers and rendered on result pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: DetectionClass,
    pub confidence: f32,
}

impl Detection {
    pub fn is_drowning(&self) -> bool {
        self.class == DetectionClass::Drowning
    }
}

/// Raw box produced by a backend, in pixel coordinates of the analyzed image.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxPrediction {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_index: usize,
}

impl BoxPrediction {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_index: usize) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_index,
        }
    }

    pub fn class(&self) -> DetectionClass {
        DetectionClass::from_class_index(self.class_index)
    }

    pub fn detection(&self) -> Detection {
        Detection {
            class: self.class(),
            confidence: self.confidence,
        }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoxPrediction) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Successful result of analyzing one image.
#[derive(Clone, Debug, Serialize)]
pub struct ImageAnalysis {
    /// Filename of the annotated copy inside the results directory.
    pub result_filename: String,
    #[serde(skip)]
    pub result_path: PathBuf,
    pub detections: Vec<Detection>,
}

impl ImageAnalysis {
    pub fn drowning_detected(&self) -> bool {
        self.detections.iter().any(Detection::is_drowning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_index_zero_is_the_only_drowning_index() {
        assert_eq!(DetectionClass::from_class_index(0), DetectionClass::Drowning);
        for index in [1, 2, 7, 79, usize::MAX] {
            assert_eq!(
                DetectionClass::from_class_index(index),
                DetectionClass::NotDrowning
            );
        }
    }

    #[test]
    fn detection_serializes_with_fixed_labels() {
        let drowning = BoxPrediction::new(0.0, 0.0, 1.0, 1.0, 0.9, 0).detection();
        let other = BoxPrediction::new(0.0, 0.0, 1.0, 1.0, 0.6, 3).detection();

        let json = serde_json::to_value(&drowning).unwrap();
        assert_eq!(json["class"], "Drowning");
        let json = serde_json::to_value(&other).unwrap();
        assert_eq!(json["class"], "Not Drowning");
        assert_eq!(other.class.label(), "Not Drowning");
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoxPrediction::new(0.0, 0.0, 10.0, 10.0, 0.5, 0);
        let b = BoxPrediction::new(5.0, 5.0, 15.0, 15.0, 0.5, 0);
        let c = BoxPrediction::new(20.0, 20.0, 30.0, 30.0, 0.5, 0);

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
        assert_eq!(a.iou(&c), 0.0);
    }
}
