//! Per-keystroke feature derivation.
//!
//! Each accepted key press becomes one `DerivedFeatureRecord`. The deriver
//! expects events already ordered by `EventNormalizer`; statistics that
//! need neighbouring records are filled in afterwards by `RollingStatistics`.

use crate::collector::types::{ClientClass, KeystrokeEvent, Session};
use crate::core::tracker::KeystrokeTracker;
use serde::{Deserialize, Serialize};

/// Upper bound for flight time. Longer gaps are thinking pauses, not rhythm.
pub const FLIGHT_TIME_CEILING_MS: i64 = 2000;

/// Digraph of the first accepted key press in a session.
pub const START_DIGRAPH: &str = "START";

/// Session-level attributes stamped onto every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub label: u8,
    pub client_class: ClientClass,
}

impl SessionContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            label: session.label(),
            client_class: session.client_class(),
        }
    }

    /// Context for an unlabeled live stream.
    pub fn live() -> Self {
        Self {
            session_id: "live".to_string(),
            label: 0,
            client_class: ClientClass::Desktop,
        }
    }
}

/// Features of one accepted key press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatureRecord {
    pub session_id: String,
    /// Zero-based position among the session's accepted presses
    pub sequence_idx: usize,
    pub char: String,
    /// Milliseconds since the previous accepted press, clamped to [0, 2000]
    pub flight_time: i64,
    /// Key hold duration in milliseconds, when the release was observed
    pub dwell_time: Option<i64>,
    pub digraph: String,
    /// 1 if the physical key was backspace
    pub is_error: u8,
    pub label: u8,
    pub client_class: ClientClass,
    /// Sample variance of the trailing five flight times (0 until five exist)
    pub flight_time_var: f64,
    /// Per-session z-score of flight time (batch path only)
    pub flight_time_norm: Option<f64>,
}

/// Clamp a raw inter-key gap into `[0, FLIGHT_TIME_CEILING_MS]`.
pub fn clamp_flight_time(raw_ms: i64) -> i64 {
    raw_ms.clamp(0, FLIGHT_TIME_CEILING_MS)
}

/// Digraph label for a press given the previous accepted character.
pub fn digraph(previous: Option<&str>, current: &str) -> String {
    match previous {
        Some(prev) => format!("{prev}-{current}"),
        None => START_DIGRAPH.to_string(),
    }
}

/// Turns an ordered event stream into feature records.
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive one record per accepted key press of `events`.
    ///
    /// Presses whose character is the unresolved sentinel are skipped
    /// without touching flight or digraph state, but they do end any pending
    /// press of the same key. Releases only contribute dwell times.
    pub fn derive(events: &[KeystrokeEvent], context: &SessionContext) -> Vec<DerivedFeatureRecord> {
        let mut records: Vec<DerivedFeatureRecord> = Vec::new();
        let mut tracker = KeystrokeTracker::new();
        let mut last_char: Option<String> = None;
        let mut rejected = 0usize;

        for event in events {
            if !event.is_down() {
                if let Some(dwell) = tracker.release(event) {
                    if let Some(record) = records.get_mut(dwell.record_idx) {
                        record.dwell_time = Some(dwell.dwell_ms);
                    }
                }
                continue;
            }

            if event.is_unresolved() {
                tracker.abandon(event);
                rejected += 1;
                continue;
            }

            let sequence_idx = records.len();
            let flight_time = clamp_flight_time(tracker.accept_down(event, sequence_idx));
            let ch = event.char_or_empty().to_string();

            records.push(DerivedFeatureRecord {
                session_id: context.session_id.clone(),
                sequence_idx,
                digraph: digraph(last_char.as_deref(), &ch),
                char: ch.clone(),
                flight_time,
                dwell_time: None,
                is_error: u8::from(event.is_backspace()),
                label: context.label,
                client_class: context.client_class,
                flight_time_var: 0.0,
                flight_time_norm: None,
            });

            last_char = Some(ch);
        }

        let unmatched = tracker.finish();
        tracing::debug!(
            session_id = %context.session_id,
            records = records.len(),
            rejected,
            unmatched,
            "Derived keystroke features"
        );

        records
    }
}
