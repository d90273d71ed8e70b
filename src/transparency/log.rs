//! Processing counters.
//!
//! Tracks how much input the pipeline saw and how much of it was usable,
//! so noisy capture shows up as numbers instead of silent drops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one process lifetime.
#[derive(Debug)]
pub struct ProcessingLog {
    /// Sessions run through the batch builder
    sessions_processed: AtomicU64,
    /// Keystroke records received (batch and online)
    events_received: AtomicU64,
    /// Malformed keystroke records dropped
    events_discarded: AtomicU64,
    /// Feature records derived
    records_derived: AtomicU64,
    /// Online analyses answered (including `collecting_data`)
    analyses_served: AtomicU64,
    /// Analyses that reached the classifier
    windows_scored: AtomicU64,
    started_at: DateTime<Utc>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self {
            sessions_processed: AtomicU64::new(0),
            events_received: AtomicU64::new(0),
            events_discarded: AtomicU64::new(0),
            records_derived: AtomicU64::new(0),
            analyses_served: AtomicU64::new(0),
            windows_scored: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_session(&self) {
        self.sessions_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of keystroke records, `discarded` of which were malformed.
    pub fn record_events(&self, received: u64, discarded: u64) {
        self.events_received.fetch_add(received, Ordering::Relaxed);
        self.events_discarded.fetch_add(discarded, Ordering::Relaxed);
    }

    pub fn record_derived(&self, count: u64) {
        self.records_derived.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an answered analysis; `scored` when the classifier ran.
    pub fn record_analysis(&self, scored: bool) {
        self.analyses_served.fetch_add(1, Ordering::Relaxed);
        if scored {
            self.windows_scored.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> ProcessingStats {
        ProcessingStats {
            sessions_processed: self.sessions_processed.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            records_derived: self.records_derived.load(Ordering::Relaxed),
            analyses_served: self.analyses_served.load(Ordering::Relaxed),
            windows_scored: self.windows_scored.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Processing Statistics:\n\
             - Sessions processed: {}\n\
             - Keystroke records received: {}\n\
             - Malformed records discarded: {}\n\
             - Feature records derived: {}\n\
             - Analyses served: {}\n\
             - Windows scored: {}",
            stats.sessions_processed,
            stats.events_received,
            stats.events_discarded,
            stats.records_derived,
            stats.analyses_served,
            stats.windows_scored,
        )
    }

    pub fn reset(&self) {
        self.sessions_processed.store(0, Ordering::Relaxed);
        self.events_received.store(0, Ordering::Relaxed);
        self.events_discarded.store(0, Ordering::Relaxed);
        self.records_derived.store(0, Ordering::Relaxed);
        self.analyses_served.store(0, Ordering::Relaxed);
        self.windows_scored.store(0, Ordering::Relaxed);
    }
}

impl Default for ProcessingLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of processing counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub sessions_processed: u64,
    pub events_received: u64,
    pub events_discarded: u64,
    pub records_derived: u64,
    pub analyses_served: u64,
    pub windows_scored: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared processing log.
pub type SharedProcessingLog = Arc<ProcessingLog>;

pub fn create_shared_log() -> SharedProcessingLog {
    Arc::new(ProcessingLog::new())
}
