//! TypeState - keystroke dynamics stress detection.
//!
//! This library turns browser keystroke logs into per-press timing features,
//! builds labeled training tables from them offline, and scores live typing
//! with a windowed classifier.
//!
//! # Guarantees
//!
//! - **One derivation**: batch and online paths share the same feature code
//! - **Order independence**: events are sorted by time before anything else
//! - **Stateless analysis**: each request carries the full history it needs
//! - **Fail fast**: missing model artifacts are reported, never guessed around
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          TypeState                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Collector  │──▶│ Normalizer  │──▶│  Features   │        │
//! │  │ (sessions)  │   │ (time sort) │   │(flight/var) │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                        │         │          │
//! │                                        ▼         ▼          │
//! │                              ┌─────────────┐ ┌───────────┐  │
//! │                              │   Builder   │ │ Analyzer  │  │
//! │                              │    (CSV)    │ │ (window)  │  │
//! │                              └─────────────┘ └───────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use typestate::{Config, ModelArtifacts, StressAnalyzer};
//! use typestate::collector::KeystrokeEvent;
//!
//! let config = Config::load().unwrap_or_default();
//! let analyzer = StressAnalyzer::from_load_result(ModelArtifacts::load(
//!     &config.resolved_model_path(),
//!     &config.resolved_scaler_path(),
//! ));
//!
//! let events = vec![KeystrokeEvent::down(0, "KeyA", "a")];
//! let result = analyzer.analyze(&events);
//! ```

pub mod analyzer;
pub mod builder;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use analyzer::{AnalysisOutcome, AnalysisResult, StressAnalyzer, StressStatus, STRESS_THRESHOLD};
pub use builder::{mode_statistics, BuildSummary, ModeStatistics, TrainingTable};
pub use collector::{KeystrokeEvent, Session};
pub use config::Config;
pub use core::{derive_features, DerivedFeatureRecord, FeatureLayout, WINDOW_SIZE};
pub use error::{AnalyzerError, ArtifactError, BuildError, InferenceError};
pub use model::{Classifier, LinearWindowClassifier, ModelArtifacts, ScalerParameters};
pub use transparency::{ProcessingLog, ProcessingStats, SharedProcessingLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
