//! Online stress analysis.
//!
//! Every call carries the complete keystroke history of one session. The
//! analyzer re-derives all features from it, takes the most recent window,
//! and asks the classifier for a score. No state survives between calls,
//! so one analyzer can serve any number of sessions concurrently.

use crate::collector::types::KeystrokeEvent;
use crate::core::layout::FeatureLayout;
use crate::core::normalizer::EventNormalizer;
use crate::core::windowing::{latest_records, InferenceWindow, WINDOW_SIZE};
use crate::core::{derive_features, DerivedFeatureRecord, SessionContext};
use crate::error::{AnalyzerError, ArtifactError, InferenceError};
use crate::model::ModelArtifacts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Scores above this are reported as stressed.
pub const STRESS_THRESHOLD: f64 = 0.6;

/// Outcome label of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressStatus {
    /// Not enough key presses yet for a full window
    CollectingData,
    Stressed,
    Relaxed,
}

impl StressStatus {
    pub fn from_score(score: f64) -> Self {
        if score > STRESS_THRESHOLD {
            StressStatus::Stressed
        } else {
            StressStatus::Relaxed
        }
    }
}

/// Score and status returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: f64,
    pub status: StressStatus,
}

impl AnalysisResult {
    pub fn collecting() -> Self {
        Self {
            score: 0.0,
            status: StressStatus::CollectingData,
        }
    }
}

/// An analysis result plus the number of key presses derived for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub records_derived: usize,
}

#[derive(Debug, Clone)]
enum ArtifactState {
    Ready(Arc<ModelArtifacts>),
    Unavailable(String),
}

/// Windowed classifier invoker over a live keystroke history.
#[derive(Debug, Clone)]
pub struct StressAnalyzer {
    artifacts: ArtifactState,
    layout: FeatureLayout,
}

impl StressAnalyzer {
    /// Create an analyzer over validated artifacts.
    pub fn new(artifacts: ModelArtifacts) -> Result<Self, ArtifactError> {
        let layout = FeatureLayout::canonical();
        artifacts.validate(&layout)?;
        Ok(Self {
            artifacts: ArtifactState::Ready(Arc::new(artifacts)),
            layout,
        })
    }

    /// An analyzer whose every call fails with `ServiceUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            artifacts: ArtifactState::Unavailable(reason.into()),
            layout: FeatureLayout::canonical(),
        }
    }

    /// Build from the outcome of startup loading, degrading to unavailable on failure.
    pub fn from_load_result(loaded: Result<ModelArtifacts, ArtifactError>) -> Self {
        match loaded.and_then(Self::new) {
            Ok(analyzer) => analyzer,
            Err(e) => {
                tracing::warn!("Model artifacts unavailable: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.artifacts, ArtifactState::Ready(_))
    }

    /// Reason the artifacts are unavailable, if they are.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.artifacts {
            ArtifactState::Ready(_) => None,
            ArtifactState::Unavailable(reason) => Some(reason),
        }
    }

    /// Derived features of a live history (no session-wide normalization).
    pub fn live_features(events: &[KeystrokeEvent]) -> Vec<DerivedFeatureRecord> {
        derive_features(events, &SessionContext::live())
    }

    fn artifacts(&self) -> Result<&ModelArtifacts, AnalyzerError> {
        match &self.artifacts {
            ArtifactState::Ready(artifacts) => Ok(artifacts.as_ref()),
            ArtifactState::Unavailable(reason) => Err(AnalyzerError::ServiceUnavailable(reason.clone())),
        }
    }

    /// Analyze a session's full keystroke history.
    pub fn analyze(&self, events: &[KeystrokeEvent]) -> Result<AnalysisResult, AnalyzerError> {
        self.analyze_counted(events).map(|outcome| outcome.result)
    }

    /// Like [`analyze`](Self::analyze), also reporting how many records were derived.
    pub fn analyze_counted(&self, events: &[KeystrokeEvent]) -> Result<AnalysisOutcome, AnalyzerError> {
        let artifacts = self.artifacts()?;

        let records = Self::live_features(events);
        let records_derived = records.len();
        let Some(recent) = latest_records(&records, WINDOW_SIZE) else {
            tracing::debug!(records = records_derived, "Collecting data");
            return Ok(AnalysisOutcome {
                result: AnalysisResult::collecting(),
                records_derived,
            });
        };

        let window = InferenceWindow::assemble(recent, &self.layout, &artifacts.scaler)?;
        let score = artifacts.classifier.predict(window.view())?;
        if !(0.0..=1.0).contains(&score) {
            return Err(InferenceError(format!("classifier returned out-of-range score {score}")).into());
        }

        Ok(AnalysisOutcome {
            result: AnalysisResult {
                score,
                status: StressStatus::from_score(score),
            },
            records_derived,
        })
    }

    /// Analyze untyped keystroke records, dropping malformed ones.
    pub fn analyze_raw(&self, records: &[Value]) -> Result<AnalysisResult, AnalyzerError> {
        self.artifacts()?;
        let normalized = EventNormalizer::normalize_raw(records);
        self.analyze(&normalized.events)
    }
}
