use std::path::{Path, PathBuf};

use crate::detect::annotate::Annotator;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::ImageAnalysis;
use crate::error::DetectError;
use crate::storage::random_hex_id;

/// Single-media detector.
///
/// Owns the loaded model backend for the lifetime of the process. Callers
/// pass it by `&mut` into each request; nothing here is global.
pub struct MediaDetector {
    backend: Box<dyn DetectorBackend>,
    annotator: Annotator,
    results_dir: PathBuf,
}

impl MediaDetector {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        annotator: Annotator,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            annotator,
            results_dir: results_dir.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Detect, annotate and save one image.
    ///
    /// Checks run in order: the file exists, it is non-empty, it decodes, the
    /// backend succeeds. The annotated copy lands in the results directory
    /// under a fresh `result_<hex>.jpg` name.
    pub fn detect_image(
        &mut self,
        path: &Path,
        confidence: f32,
    ) -> Result<ImageAnalysis, DetectError> {
        log::info!("processing image {}", path.display());

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(DetectError::NotFound),
        };
        if metadata.len() == 0 {
            return Err(DetectError::Empty);
        }

        // Uploads keep their client-side extension, so sniff the format.
        let decoded = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode());
        let image = match decoded {
            Ok(image) => image.into_rgb8(),
            Err(err) => {
                log::warn!("failed to decode {}: {}", path.display(), err);
                return Err(DetectError::Undecodable);
            }
        };
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::Undecodable);
        }

        let mut boxes = self.backend.detect(&image, confidence).map_err(|err| {
            log::error!("{} backend failed on {}: {:#}", self.backend.name(), path.display(), err);
            DetectError::Inference(format!("{:#}", err))
        })?;
        boxes.retain(|b| b.confidence >= confidence);
        log::info!("detection complete, boxes found: {}", boxes.len());

        let detections = boxes
            .iter()
            .map(|b| {
                log::debug!(
                    "detected class={} confidence={:.2}",
                    b.class_index,
                    b.confidence
                );
                b.detection()
            })
            .collect();

        let mut annotated = image;
        self.annotator.annotate(&mut annotated, &boxes);

        let result_filename = format!("result_{}.jpg", random_hex_id());
        let result_path = self.results_dir.join(&result_filename);
        annotated
            .save(&result_path)
            .map_err(|err| DetectError::Save(err.to_string()))?;

        Ok(ImageAnalysis {
            result_filename,
            result_path,
            detections,
        })
    }
}
