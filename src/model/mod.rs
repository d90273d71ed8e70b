//! Model artifacts loaded once at startup.
//!
//! The scaler and classifier are immutable after loading and shared by
//! every analysis through `Arc`.

pub mod classifier;
pub mod scaler;

pub use classifier::{Classifier, LinearWindowClassifier};
pub use scaler::ScalerParameters;

use crate::core::layout::FeatureLayout;
use crate::core::windowing::WINDOW_SIZE;
use crate::error::ArtifactError;
use std::path::Path;
use std::sync::Arc;

/// The scaler and classifier the online analyzer runs with.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub scaler: ScalerParameters,
    pub classifier: Arc<dyn Classifier>,
}

impl ModelArtifacts {
    pub fn new(scaler: ScalerParameters, classifier: Arc<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }

    /// Load the JSON scaler and the linear window classifier from disk.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        let scaler = ScalerParameters::load(scaler_path)?;
        let classifier = LinearWindowClassifier::load(model_path)?;
        tracing::info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            "Loaded model artifacts"
        );
        Ok(Self::new(scaler, Arc::new(classifier)))
    }

    /// Check both artifacts agree with the feature layout and window size.
    pub fn validate(&self, layout: &FeatureLayout) -> Result<(), ArtifactError> {
        self.scaler.ensure_layout(layout)?;

        let classifier = &self.classifier;
        if classifier.window_len() != WINDOW_SIZE || classifier.feature_count() != layout.len() {
            return Err(ArtifactError::Invalid(format!(
                "classifier expects a {}x{} window, pipeline produces {}x{}",
                classifier.window_len(),
                classifier.feature_count(),
                WINDOW_SIZE,
                layout.len()
            )));
        }

        if let Some(names) = classifier.feature_names() {
            let expected = layout.names();
            if names != expected.as_slice() {
                return Err(ArtifactError::LayoutMismatch {
                    expected,
                    found: names.to_vec(),
                });
            }
        }

        Ok(())
    }
}
