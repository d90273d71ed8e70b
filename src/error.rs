//! Error types for TypeState.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating the scaler and classifier artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Feature layout mismatch: expected {expected:?}, artifact declares {found:?}")]
    LayoutMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Errors a classifier implementation may return from `predict`.
#[derive(Debug, Error)]
#[error("Inference failed: {0}")]
pub struct InferenceError(pub String);

/// Errors surfaced by the online analyzer.
///
/// Missing evidence is not an error; it is reported through
/// `StressStatus::CollectingData`.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Model artifacts unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Feature assembly failed: {0}")]
    FeatureAssembly(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Errors raised by the batch training-table builder.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid session export: {0}")]
    InvalidInput(String),
}
