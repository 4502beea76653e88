//! Box and label overlay for annotated result images.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detect::result::BoxPrediction;

/// Label font used unless `model.label_font` overrides it.
const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

const LINE_THICKNESS: u32 = 2;
const LABEL_SCALE: f32 = 18.0;
/// Gap between the label baseline area and the box top.
const LABEL_GAP: u32 = 4;
const FALLBACK_TAB_HEIGHT: u32 = 6;
const FALLBACK_TAB_WIDTH: u32 = 24;

/// Draws detection boxes and `"<class>: <confidence>"` labels onto images.
///
/// Labels are drawn in the box color just above the box, or inside its top
/// edge when the box touches the top of the image.
pub struct Annotator {
    font: Option<FontArc>,
    scale: PxScale,
    line_thickness: u32,
}

impl Annotator {
    /// Annotator using the bundled DejaVu Sans Mono font.
    pub fn new() -> Self {
        let font = match FontArc::try_from_slice(DEFAULT_FONT) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!(
                    "bundled label font is unusable ({}); labels will be drawn without text",
                    err
                );
                None
            }
        };
        Self::with_font(font)
    }

    fn with_font(font: Option<FontArc>) -> Self {
        Self {
            font,
            scale: PxScale::from(LABEL_SCALE),
            line_thickness: LINE_THICKNESS,
        }
    }

    /// Load a TrueType/OpenType font for label text.
    pub fn with_font_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read label font {}", path.display()))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|_| anyhow!("invalid label font {}", path.display()))?;
        Ok(Self::with_font(Some(font)))
    }

    /// Use the font at `path` if given, otherwise the bundled one. A font
    /// that fails to load falls back to the bundled one.
    pub fn from_font_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };
        match Self::with_font_file(path) {
            Ok(annotator) => annotator,
            Err(err) => {
                log::warn!("{:#}; using the bundled label font", err);
                Self::new()
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every box onto `image`. Boxes are clamped to the image bounds;
    /// boxes with no area left after clamping are skipped.
    pub fn annotate(&self, image: &mut RgbImage, boxes: &[BoxPrediction]) {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        for prediction in boxes {
            let Some(rect) = clamp_box(prediction, width, height) else {
                log::debug!("skipping degenerate box {:?}", prediction);
                continue;
            };
            let color = prediction.class().color();

            for t in 0..self.line_thickness {
                let w = rect.width().saturating_sub(2 * t);
                let h = rect.height().saturating_sub(2 * t);
                if w == 0 || h == 0 {
                    break;
                }
                let inner = Rect::at(rect.left() + t as i32, rect.top() + t as i32).of_size(w, h);
                draw_hollow_rect_mut(image, inner, color);
            }

            let label = format!(
                "{}: {:.2}",
                prediction.class().label(),
                prediction.confidence
            );
            self.draw_label(image, &rect, &label, color);
        }
    }

    fn draw_label(&self, image: &mut RgbImage, rect: &Rect, label: &str, color: Rgb<u8>) {
        let x = rect.left();
        let top = rect.top() as u32;

        let Some(font) = &self.font else {
            let tab_top = top.saturating_sub(FALLBACK_TAB_HEIGHT);
            let tab_width = FALLBACK_TAB_WIDTH.min(rect.width());
            let tab = Rect::at(x, tab_top as i32).of_size(tab_width, FALLBACK_TAB_HEIGHT);
            draw_filled_rect_mut(image, tab, color);
            return;
        };

        let (_, text_h) = text_size(self.scale, font, label);
        // Above the box when there is room, otherwise inside its top edge.
        let text_top = if top >= text_h + LABEL_GAP {
            top - text_h - LABEL_GAP
        } else {
            top + self.line_thickness + 1
        };
        draw_text_mut(image, color, x, text_top as i32, self.scale, font, label);
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_box(prediction: &BoxPrediction, width: u32, height: u32) -> Option<Rect> {
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x1 = prediction.x1.floor().max(0.0).min(max_x) as u32;
    let y1 = prediction.y1.floor().max(0.0).min(max_y) as u32;
    let x2 = prediction.x2.ceil().max(0.0).min(max_x) as u32;
    let y2 = prediction.y2.ceil().max(0.0).min(max_y) as u32;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::at(x1 as i32, y1 as i32).of_size(x2 - x1 + 1, y2 - y1 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::DetectionClass;

    #[test]
    fn draws_box_edges_in_class_color() {
        let mut image = RgbImage::new(64, 64);
        let boxes = vec![
            BoxPrediction::new(10.0, 20.0, 30.0, 40.0, 0.9, 0),
            BoxPrediction::new(40.0, 40.0, 60.0, 60.0, 0.7, 5),
        ];

        Annotator::new().annotate(&mut image, &boxes);

        assert_eq!(*image.get_pixel(10, 30), DetectionClass::Drowning.color());
        assert_eq!(*image.get_pixel(11, 30), DetectionClass::Drowning.color());
        assert_eq!(*image.get_pixel(20, 30), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(60, 50), DetectionClass::NotDrowning.color());
    }

    #[test]
    fn fallback_label_tab_sits_above_box() {
        let mut image = RgbImage::new(64, 64);
        let boxes = vec![BoxPrediction::new(10.0, 20.0, 50.0, 40.0, 0.9, 0)];

        Annotator::with_font(None).annotate(&mut image, &boxes);

        assert_eq!(*image.get_pixel(12, 16), DetectionClass::Drowning.color());
    }

    #[test]
    fn out_of_bounds_boxes_are_clamped() {
        let mut image = RgbImage::new(32, 32);
        let boxes = vec![
            BoxPrediction::new(-50.0, -50.0, 500.0, 500.0, 0.9, 1),
            BoxPrediction::new(10.0, 10.0, 10.0, 10.0, 0.9, 0),
            BoxPrediction::new(f32::NAN, 0.0, 5.0, 5.0, 0.9, 0),
        ];

        Annotator::with_font(None).annotate(&mut image, &boxes);

        assert_eq!(*image.get_pixel(0, 16), DetectionClass::NotDrowning.color());
        assert_eq!(*image.get_pixel(31, 16), DetectionClass::NotDrowning.color());
    }

    #[test]
    fn bundled_font_draws_label_text_above_box() {
        let annotator = Annotator::new();
        assert!(annotator.has_font());

        let mut image = RgbImage::new(200, 120);
        annotator.annotate(&mut image, &[BoxPrediction::new(20.0, 60.0, 120.0, 110.0, 0.91, 0)]);

        // Only the blue channel is ever written for a drowning label.
        let label_pixels = (0..60)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let pixel = image.get_pixel(x, y);
                pixel[2] > 0 && pixel[0] == 0 && pixel[1] == 0
            })
            .count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn label_text_reflects_confidence() {
        let annotator = Annotator::new();
        let render = |confidence: f32| {
            let mut image = RgbImage::new(200, 120);
            annotator.annotate(
                &mut image,
                &[BoxPrediction::new(20.0, 60.0, 120.0, 110.0, confidence, 0)],
            );
            image
        };

        let high = render(0.91);
        let low = render(0.47);
        let label_differs = (0..60)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .any(|(x, y)| high.get_pixel(x, y) != low.get_pixel(x, y));
        assert!(label_differs);
        // Box edges are identical.
        assert_eq!(high.get_pixel(20, 80), low.get_pixel(20, 80));
    }

    #[test]
    fn unreadable_font_override_falls_back_to_bundled_font() {
        let annotator = Annotator::from_font_path(Some(Path::new("/nonexistent/font.ttf")));
        assert!(annotator.has_font());
        assert!(Annotator::with_font_file(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn font_override_is_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.ttf");
        std::fs::write(&path, DEFAULT_FONT).unwrap();
        assert!(Annotator::with_font_file(&path).unwrap().has_font());

        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        assert!(Annotator::with_font_file(&bogus).is_err());
    }
}
