//! On-disk layout for uploads, annotated results and extracted video frames.
//!
//! ```text
//! <root>/uploads/upload_<hex><ext>
//! <root>/results/result_<hex>.jpg
//! <root>/frames/<video_id>/frame_<index>.jpg
//! ```
//!
//! Every name carries a fresh random identifier, so concurrent writers never
//! collide and nothing needs locking. Nothing is ever cleaned up.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::RngCore;

use crate::media::{file_extension, MediaKind};

pub const UPLOADS_DIR: &str = "uploads";
pub const RESULTS_DIR: &str = "results";
pub const FRAMES_DIR: &str = "frames";

/// 16 random bytes as 32 lowercase hex characters.
pub fn random_hex_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Directory exposed read-only over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServedArea {
    Uploads,
    Results,
    Frames,
}

#[derive(Clone, Debug)]
pub struct StoredUpload {
    pub filename: String,
    pub path: PathBuf,
    pub kind: MediaKind,
}

#[derive(Clone, Debug)]
pub struct MediaStore {
    uploads: PathBuf,
    results: PathBuf,
    frames: PathBuf,
}

impl MediaStore {
    /// Create (if needed) the three scratch directories under `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let store = Self {
            uploads: root.join(UPLOADS_DIR),
            results: root.join(RESULTS_DIR),
            frames: root.join(FRAMES_DIR),
        };
        for dir in [&store.uploads, &store.results, &store.frames] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        Ok(store)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn results_dir(&self) -> &Path {
        &self.results
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames
    }

    /// Persist an upload under `upload_<hex><ext>`, keeping the original
    /// extension (lowercased) so the media kind can be re-derived.
    pub fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        let filename = format!("upload_{}{}", random_hex_id(), file_extension(original_name));
        let path = self.uploads.join(&filename);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write upload {}", path.display()))?;
        log::info!(
            "stored upload '{}' as {} ({} bytes)",
            original_name,
            filename,
            bytes.len()
        );
        Ok(StoredUpload {
            kind: MediaKind::from_filename(original_name),
            filename,
            path,
        })
    }

    /// Fresh per-video directory for extracted frames.
    pub fn create_frame_dir(&self) -> std::io::Result<(String, PathBuf)> {
        let video_id = random_hex_id();
        let dir = self.frames.join(&video_id);
        std::fs::create_dir_all(&dir)?;
        Ok((video_id, dir))
    }

    /// Map served path segments onto a file inside `area`.
    ///
    /// Results and uploads take one segment (the filename); frames take two
    /// (video id, filename). Returns `None` for anything that could escape the
    /// area or does not name an existing file.
    pub fn resolve(&self, area: ServedArea, segments: &[&str]) -> Option<PathBuf> {
        if !segments.iter().all(|segment| is_safe_segment(segment)) {
            return None;
        }
        let path = match (area, segments) {
            (ServedArea::Uploads, [name]) => self.uploads.join(name),
            (ServedArea::Results, [name]) => self.results.join(name),
            (ServedArea::Frames, [video_id, name]) => self.frames.join(video_id).join(name),
            _ => return None,
        };
        path.is_file().then_some(path)
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.contains(['/', '\\', '\0'])
}
