//! YOLOv8 output decoding.
//!
//! YOLOv8 detection heads emit one tensor of shape `[1, 4 + classes, anchors]`
//! where each anchor carries `[cx, cy, w, h]` in model-input pixels followed by
//! one score per class. Some exports transpose the last two axes; both layouts
//! are accepted.

use anyhow::{anyhow, Result};

use crate::detect::result::BoxPrediction;

/// Decode a raw YOLOv8 output tensor into boxes.
///
/// `scale_x`/`scale_y` map model-input pixels back to source-image pixels.
pub fn decode_yolo_output(
    shape: &[usize],
    data: &[f32],
    confidence: f32,
    scale_x: f32,
    scale_y: f32,
) -> Result<Vec<BoxPrediction>> {
    if shape.len() != 3 {
        return Err(anyhow!("expected 3D output tensor, got {}D", shape.len()));
    }
    if shape[0] != 1 {
        return Err(anyhow!("expected batch size 1, got {}", shape[0]));
    }

    // Anchors outnumber features in every YOLOv8 export.
    let (num_features, num_anchors, transposed) = if shape[1] <= shape[2] {
        (shape[1], shape[2], false)
    } else {
        (shape[2], shape[1], true)
    };
    if num_features < 5 {
        return Err(anyhow!(
            "output has {} features per anchor, need at least 5",
            num_features
        ));
    }
    let expected = num_features * num_anchors;
    if data.len() != expected {
        return Err(anyhow!(
            "expected {} output values, received {}",
            expected,
            data.len()
        ));
    }

    let feature = |anchor: usize, index: usize| {
        if transposed {
            data[anchor * num_features + index]
        } else {
            data[index * num_anchors + anchor]
        }
    };

    let mut boxes = Vec::new();
    for anchor in 0..num_anchors {
        let mut best_score = f32::NEG_INFINITY;
        let mut best_class = 0usize;
        for class_index in 0..num_features - 4 {
            let score = feature(anchor, 4 + class_index);
            if score > best_score {
                best_score = score;
                best_class = class_index;
            }
        }
        if !best_score.is_finite() || best_score < confidence {
            continue;
        }

        let cx = feature(anchor, 0);
        let cy = feature(anchor, 1);
        let w = feature(anchor, 2);
        let h = feature(anchor, 3);
        boxes.push(BoxPrediction::new(
            (cx - w / 2.0) * scale_x,
            (cy - h / 2.0) * scale_y,
            (cx + w / 2.0) * scale_x,
            (cy + h / 2.0) * scale_y,
            best_score,
            best_class,
        ));
    }

    Ok(boxes)
}

/// Per-class non-maximum suppression. Output is sorted by confidence.
pub fn non_max_suppression(
    mut boxes: Vec<BoxPrediction>,
    iou_threshold: f32,
) -> Vec<BoxPrediction> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoxPrediction> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        let suppressed = keep.iter().any(|kept| {
            kept.class_index == candidate.class_index && kept.iou(&candidate) >= iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}
