use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::BoxPrediction;

/// One scripted reply of the stub backend.
#[derive(Clone, Debug)]
pub enum StubResponse {
    Boxes(Vec<BoxPrediction>),
    Fail(String),
}

/// Stub backend for tests and `stub://` model paths.
///
/// Replays its script in a cycle, one entry per `detect` call. An empty
/// script never detects anything.
pub struct StubBackend {
    script: Vec<StubResponse>,
    calls: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            calls: 0,
        }
    }

    /// Same boxes on every call.
    pub fn with_boxes(boxes: Vec<BoxPrediction>) -> Self {
        Self::scripted(vec![StubResponse::Boxes(boxes)])
    }

    /// Boxes per call, cycling when the sequence runs out.
    pub fn with_sequence(sequence: Vec<Vec<BoxPrediction>>) -> Self {
        Self::scripted(sequence.into_iter().map(StubResponse::Boxes).collect())
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![StubResponse::Fail(message.to_string())])
    }

    pub fn scripted(script: Vec<StubResponse>) -> Self {
        Self { script, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _image: &RgbImage, confidence: f32) -> Result<Vec<BoxPrediction>> {
        let call = self.calls;
        self.calls += 1;

        if self.script.is_empty() {
            return Ok(Vec::new());
        }

        match &self.script[call % self.script.len()] {
            StubResponse::Boxes(boxes) => Ok(boxes
                .iter()
                .filter(|b| b.confidence >= confidence)
                .cloned()
                .collect()),
            StubResponse::Fail(message) => Err(anyhow!("{}", message)),
        }
    }
}
