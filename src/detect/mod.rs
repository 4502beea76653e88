mod annotate;
mod backend;
pub mod backends;
mod detector;
pub mod postprocess;
mod result;

pub use annotate::Annotator;
pub use backend::DetectorBackend;
pub use backends::{build_backend, StubBackend, StubResponse};
pub use detector::MediaDetector;
pub use result::{
    BoxPrediction, Detection, DetectionClass, ImageAnalysis, DROWNING_CLASS_INDEX,
};
