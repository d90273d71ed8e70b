//! Standard-scaler parameters fitted offline.
//!
//! Only the apply side lives here: `(x - mean) / scale` per column.

use crate::core::layout::FeatureLayout;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-feature affine transform, ordered by feature name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParameters {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerParameters {
    pub fn new(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let scaler = Self {
            feature_names,
            mean,
            scale,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let scaler: ScalerParameters = serde_json::from_str(json)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(ArtifactError::Invalid("scaler declares no features".to_string()));
        }
        if self.mean.len() != n || self.scale.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "scaler has {} names, {} means, {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ArtifactError::Invalid("scaler mean is not finite".to_string()));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ArtifactError::Invalid(
                "scaler scale must be finite and non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the scaler was fit on exactly the layout's scaled columns, in order.
    pub fn ensure_layout(&self, layout: &FeatureLayout) -> Result<(), ArtifactError> {
        let expected = layout.scaled_names();
        if self.feature_names != expected {
            return Err(ArtifactError::LayoutMismatch {
                expected,
                found: self.feature_names.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Standardize one row given in scaler column order.
    ///
    /// Returns `None` when the row width does not match.
    pub fn transform(&self, row: &[f64]) -> Option<Vec<f64>> {
        if row.len() != self.len() {
            return None;
        }
        Some(
            row.iter()
                .zip(self.mean.iter().zip(&self.scale))
                .map(|(x, (mean, scale))| (x - mean) / scale)
                .collect(),
        )
    }
}
