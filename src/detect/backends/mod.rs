pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{StubBackend, StubResponse};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::Result;

use crate::config::ModelSettings;
use crate::detect::backend::DetectorBackend;

/// Model paths with this prefix select the stub backend (no model file).
pub const STUB_MODEL_SCHEME: &str = "stub://";

/// Build the backend named by the model settings.
pub fn build_backend(settings: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
    if settings.path.starts_with(STUB_MODEL_SCHEME) {
        log::warn!(
            "model path {} selects the stub backend; nothing will be detected",
            settings.path
        );
        return Ok(Box::new(StubBackend::new()));
    }

    #[cfg(feature = "backend-tract")]
    {
        let backend = TractBackend::new(&settings.path, settings.input_size)?
            .with_iou_threshold(settings.iou_threshold);
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow::anyhow!(
            "model inference requires the backend-tract feature (model path '{}')",
            settings.path
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_scheme_selects_stub_backend() {
        let settings = ModelSettings {
            path: "stub://empty".to_string(),
            ..ModelSettings::default()
        };
        let backend = build_backend(&settings).unwrap();
        assert_eq!(backend.name(), "stub");
    }
}
