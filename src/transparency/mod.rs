//! Processing transparency for TypeState.
//!
//! Counters describing what the pipeline received, dropped, and scored.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, ProcessingLog, ProcessingStats, SharedProcessingLog};
