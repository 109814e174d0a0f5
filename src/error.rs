//! Terminal failure classes reported through the preview's error callback.

use thiserror::Error;

/// Everything that can end a preview attempt. Each variant is handled at the
/// narrowest boundary that can still render the fallback visual; none of
/// them escapes the orchestrator except through the error callback.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Extension outside the supported set; the loader is never invoked.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// The format capability could not parse the bytes.
    #[error("failed to load model: {0}")]
    LoadFailure(#[from] anyhow::Error),

    /// Uncaught failure during scene construction or rendering, reported by
    /// the surface as a safety net and treated like a load failure.
    #[error("render error: {0}")]
    RuntimeRender(String),

    /// Bounding volume collapsed to a single point; no finite uniform scale
    /// exists, so no dimensions are published.
    #[error("model has degenerate geometry (zero size in every axis)")]
    DegenerateGeometry,

    /// Every normalization attempt saw an empty bounding volume.
    #[error("model geometry never became available for measurement")]
    NormalizationTimeout,
}

impl PreviewError {
    /// True for failures that should show the fallback shape. A timeout and
    /// degenerate geometry leave the loaded (unmeasured) scene in place.
    pub fn replaces_scene(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::LoadFailure(_) | Self::RuntimeRender(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let err = PreviewError::UnsupportedFormat {
            extension: "xyz".into(),
        };
        assert!(err.to_string().contains("xyz"));

        let err = PreviewError::LoadFailure(anyhow::anyhow!("bad header"));
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_fallback_classification() {
        assert!(PreviewError::RuntimeRender("gpu lost".into()).replaces_scene());
        assert!(!PreviewError::DegenerateGeometry.replaces_scene());
        assert!(!PreviewError::NormalizationTimeout.replaces_scene());
    }
}
