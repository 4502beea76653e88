//! User-facing error taxonomy.
//!
//! The `Display` strings of these errors are shown verbatim on the upload
//! page, so they are worded for the person who uploaded the file.

use thiserror::Error;

/// Failure of the single-media detector, in the order the checks run.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Image file not found")]
    NotFound,

    #[error("Image file is empty")]
    Empty,

    #[error("Could not load image")]
    Undecodable,

    #[error("Model prediction failed: {0}")]
    Inference(String),

    #[error("Could not save result image: {0}")]
    Save(String),
}

/// Failure that aborts a whole video request.
///
/// Per-frame problems never surface here; they are logged and the frame is
/// skipped.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Could not open video file")]
    Open(String),

    #[error("Video processing failed: {0}")]
    Scratch(#[source] std::io::Error),
}
