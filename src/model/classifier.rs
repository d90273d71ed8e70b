//! Classifier seam and the bundled linear window model.

use crate::error::{ArtifactError, InferenceError};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A model scoring one fixed-shape window of feature vectors.
///
/// Implementations are shared across concurrent requests and must be
/// reentrant.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Number of rows (key presses) per window.
    fn window_len(&self) -> usize;

    /// Number of columns per row.
    fn feature_count(&self) -> usize;

    /// Column names the model was trained on, if the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Score a `window_len x feature_count` window. The result is in [0, 1].
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64, InferenceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearWindowArtifact {
    window_len: usize,
    feature_names: Vec<String>,
    weights: Vec<Vec<f64>>,
    bias: f64,
}

/// Logistic model over the flattened window: `sigmoid(bias + sum(w * x))`.
#[derive(Debug, Clone)]
pub struct LinearWindowClassifier {
    feature_names: Vec<String>,
    weights: Array2<f64>,
    bias: f64,
}

impl LinearWindowClassifier {
    pub fn new(feature_names: Vec<String>, weights: Array2<f64>, bias: f64) -> Result<Self, ArtifactError> {
        let (rows, cols) = weights.dim();
        if rows == 0 || cols == 0 {
            return Err(ArtifactError::Invalid("classifier weights are empty".to_string()));
        }
        if cols != feature_names.len() {
            return Err(ArtifactError::Invalid(format!(
                "classifier has {} weight columns for {} features",
                cols,
                feature_names.len()
            )));
        }
        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(ArtifactError::Invalid("classifier parameters are not finite".to_string()));
        }

        Ok(Self {
            feature_names,
            weights,
            bias,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: LinearWindowArtifact = serde_json::from_str(json)?;
        let cols = artifact.feature_names.len();

        if artifact.weights.len() != artifact.window_len {
            return Err(ArtifactError::Invalid(format!(
                "classifier declares window_len {} but has {} weight rows",
                artifact.window_len,
                artifact.weights.len()
            )));
        }
        if artifact.weights.iter().any(|row| row.len() != cols) {
            return Err(ArtifactError::Invalid(format!(
                "every weight row must have {cols} columns"
            )));
        }

        let flat: Vec<f64> = artifact.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((artifact.window_len, cols), flat)
            .map_err(|e| ArtifactError::Invalid(e.to_string()))?;

        Self::new(artifact.feature_names, weights, artifact.bias)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        let artifact = LinearWindowArtifact {
            window_len: self.weights.nrows(),
            feature_names: self.feature_names.clone(),
            weights: self.weights.rows().into_iter().map(|r| r.to_vec()).collect(),
            bias: self.bias,
        };
        Ok(serde_json::to_string_pretty(&artifact)?)
    }
}

impl Classifier for LinearWindowClassifier {
    fn window_len(&self) -> usize {
        self.weights.nrows()
    }

    fn feature_count(&self) -> usize {
        self.weights.ncols()
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.feature_names)
    }

    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64, InferenceError> {
        if window.dim() != self.weights.dim() {
            return Err(InferenceError(format!(
                "expected a {:?} window, got {:?}",
                self.weights.dim(),
                window.dim()
            )));
        }

        let logit = self.bias
            + window
                .iter()
                .zip(self.weights.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>();
        let score = 1.0 / (1.0 + (-logit).exp());

        if !score.is_finite() {
            return Err(InferenceError(format!("non-finite score from logit {logit}")));
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["flight_time".to_string(), "is_error".to_string()]
    }

    #[test]
    fn test_zero_weights_give_half() {
        let model = LinearWindowClassifier::new(names(), Array2::zeros((3, 2)), 0.0).unwrap();
        let score = model.predict(Array2::ones((3, 2)).view()).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_sum() {
        let weights = array![[1.0, 0.0], [0.0, 2.0]];
        let model = LinearWindowClassifier::new(names(), weights, -1.0).unwrap();
        // logit = -1 + 1*1 + 2*0.5 = 1
        let score = model.predict(array![[1.0, 9.0], [9.0, 0.5]].view()).unwrap();
        assert!((score - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let model = LinearWindowClassifier::new(names(), Array2::zeros((3, 2)), 0.0).unwrap();
        assert!(model.predict(Array2::zeros((2, 2)).view()).is_err());
    }

    #[test]
    fn test_json_artifact() {
        let json = r#"{
            "window_len": 2,
            "feature_names": ["flight_time", "is_error"],
            "weights": [[0.5, 1.0], [0.25, -1.0]],
            "bias": 0.1
        }"#;
        let model = LinearWindowClassifier::from_json(json).unwrap();
        assert_eq!(model.window_len(), 2);
        assert_eq!(model.feature_count(), 2);

        let reloaded = LinearWindowClassifier::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.weights, model.weights);
    }

    #[test]
    fn test_malformed_artifacts() {
        let ragged = r#"{"window_len": 2, "feature_names": ["a"], "weights": [[1.0], [1.0, 2.0]], "bias": 0}"#;
        assert!(LinearWindowClassifier::from_json(ragged).is_err());

        let short = r#"{"window_len": 3, "feature_names": ["a"], "weights": [[1.0]], "bias": 0}"#;
        assert!(LinearWindowClassifier::from_json(short).is_err());
    }
}
