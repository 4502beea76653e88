use anyhow::Result;
use image::RgbImage;

use crate::detect::result::BoxPrediction;

/// Detector backend trait.
///
/// A backend wraps one loaded model. It receives a decoded RGB image and the
/// caller's confidence threshold and returns boxes in the image's pixel
/// coordinates. Backends must not write to disk; annotation and persistence
/// belong to `MediaDetector`.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one image.
    ///
    /// Implementations should drop boxes below `confidence`; callers filter
    /// again regardless.
    fn detect(&mut self, image: &RgbImage, confidence: f32) -> Result<Vec<BoxPrediction>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
