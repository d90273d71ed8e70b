//! Core keystroke feature pipeline.
//!
//! This module contains:
//! - Event ordering and validation
//! - Key state tracking (flight and dwell bookkeeping)
//! - Per-press feature derivation
//! - Session-scoped rolling statistics
//! - The canonical model input layout and inference window
//!
//! Batch and online paths both go through [`derive_features`], which is
//! what keeps their values identical for the same events.

pub mod features;
pub mod layout;
pub mod normalizer;
pub mod rolling;
pub mod tracker;
pub mod windowing;

// Re-export commonly used types
pub use features::{
    clamp_flight_time, DerivedFeatureRecord, FeatureDeriver, SessionContext,
    FLIGHT_TIME_CEILING_MS, START_DIGRAPH,
};
pub use layout::{ColumnTreatment, FeatureColumn, FeatureLayout, FEATURE_COUNT};
pub use normalizer::{EventNormalizer, NormalizedEvents};
pub use rolling::{rolling_variance, zscore, RollingStatistics, ROLLING_WINDOW};
pub use tracker::{ActiveKeyMap, DwellObservation, KeystrokeTracker};
pub use windowing::{latest_records, InferenceWindow, WINDOW_SIZE};

use crate::collector::types::KeystrokeEvent;

/// Order, derive, and attach rolling variance for one session's events.
///
/// Does not compute the batch-only normalized flight time.
pub fn derive_features(events: &[KeystrokeEvent], context: &SessionContext) -> Vec<DerivedFeatureRecord> {
    let ordered = EventNormalizer::normalize(events);
    let mut records = FeatureDeriver::derive(&ordered, context);
    RollingStatistics::apply(&mut records);
    records
}
