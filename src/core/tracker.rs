//! Per-session key state: dwell pairing and flight-time bookkeeping.

use crate::collector::types::KeystrokeEvent;
use std::collections::HashMap;

/// An accepted press still waiting for its release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingPress {
    down_time: i64,
    /// Index of the feature record emitted for the press
    record_idx: usize,
}

/// Key identifier -> most recent unmatched accepted press.
#[derive(Debug, Default)]
pub struct ActiveKeyMap {
    pending: HashMap<String, PendingPress>,
}

impl ActiveKeyMap {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }
}

/// Hold duration of a completed press, tied to the record of its down event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellObservation {
    pub down_time: i64,
    pub record_idx: usize,
    pub dwell_ms: i64,
}

/// Tracks key state while one session's ordered events are replayed.
///
/// A tracker lives for exactly one session; create a new one per session.
#[derive(Debug, Default)]
pub struct KeystrokeTracker {
    active: ActiveKeyMap,
    last_down_time: Option<i64>,
}

impl KeystrokeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unclamped time since the last accepted press, or 0 for the first one.
    pub fn flight_time(&self, time: i64) -> i64 {
        self.last_down_time.map_or(0, |last| time.saturating_sub(last))
    }

    /// Register an accepted press and return its unclamped flight time.
    ///
    /// A still-pending press of the same key is abandoned.
    pub fn accept_down(&mut self, event: &KeystrokeEvent, record_idx: usize) -> i64 {
        let flight = self.flight_time(event.time);
        self.active.pending.insert(
            event.key.clone(),
            PendingPress {
                down_time: event.time,
                record_idx,
            },
        );
        self.last_down_time = Some(event.time);
        flight
    }

    /// Drop any pending press of `event`'s key without recording a new one.
    ///
    /// Used for rejected presses. Flight state is untouched.
    pub fn abandon(&mut self, event: &KeystrokeEvent) -> bool {
        self.active.pending.remove(&event.key).is_some()
    }

    /// Match a release against its pending press.
    ///
    /// Releases without a pending press (truncated capture, rejected press)
    /// yield nothing.
    pub fn release(&mut self, event: &KeystrokeEvent) -> Option<DwellObservation> {
        let press = self.active.pending.remove(&event.key)?;
        Some(DwellObservation {
            down_time: press.down_time,
            record_idx: press.record_idx,
            dwell_ms: event.time.saturating_sub(press.down_time),
        })
    }

    pub fn active_keys(&self) -> &ActiveKeyMap {
        &self.active
    }

    /// End the session, dropping presses that never saw a release.
    ///
    /// Returns the number of dropped presses.
    pub fn finish(self) -> usize {
        self.active.len()
    }
}
