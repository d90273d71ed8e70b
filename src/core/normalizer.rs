//! Event ordering for a single session.
//!
//! Clients deliver events in arrival order, which network lag and key
//! rollover can scramble. Everything downstream sees events sorted by
//! timestamp, with ties kept in their original relative order.

use crate::collector::loader::parse_events;
use crate::collector::types::KeystrokeEvent;
use serde_json::Value;

/// Ordered events for one session plus the count of malformed records dropped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvents {
    pub events: Vec<KeystrokeEvent>,
    pub discarded: usize,
}

/// Sorts and validates the events of one session.
pub struct EventNormalizer;

impl EventNormalizer {
    /// Return a copy of `events` ordered by ascending timestamp (stable on ties).
    pub fn normalize(events: &[KeystrokeEvent]) -> Vec<KeystrokeEvent> {
        let mut ordered = events.to_vec();
        // sort_by_key is stable
        ordered.sort_by_key(|e| e.time);
        ordered
    }

    /// Validate untyped records, drop malformed ones, and order the rest.
    pub fn normalize_raw(records: &[Value]) -> NormalizedEvents {
        let parsed = parse_events(records);
        if parsed.discarded > 0 {
            tracing::debug!(discarded = parsed.discarded, "Dropped malformed keystroke records");
        }

        NormalizedEvents {
            events: Self::normalize(&parsed.events),
            discarded: parsed.discarded,
        }
    }
}
