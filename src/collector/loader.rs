//! Lenient loading of session exports and live payloads.
//!
//! Capture on real devices is noisy, so a bad record never fails the whole
//! load: malformed keystrokes are dropped and counted instead.

use crate::collector::types::{KeystrokeEvent, Session};
use crate::error::BuildError;
use serde_json::Value;
use std::path::Path;

/// Placeholder for sessions exported without an identifier or mode.
pub const UNKNOWN: &str = "unknown";

/// Events parsed from untyped records, with the number that were rejected.
#[derive(Debug, Clone, Default)]
pub struct ParsedEvents {
    pub events: Vec<KeystrokeEvent>,
    pub discarded: usize,
}

/// Parse keystroke records, keeping input order and skipping malformed ones.
pub fn parse_events(values: &[Value]) -> ParsedEvents {
    let mut parsed = ParsedEvents {
        events: Vec::with_capacity(values.len()),
        discarded: 0,
    };

    for value in values {
        match KeystrokeEvent::from_value(value) {
            Some(event) => parsed.events.push(event),
            None => parsed.discarded += 1,
        }
    }

    parsed
}

/// A session together with the count of keystroke records dropped while parsing it.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub session: Session,
    pub discarded: usize,
}

/// Build a session from one exported JSON object.
///
/// Returns `None` when the value is not an object.
pub fn parse_session(value: &Value) -> Option<LoadedSession> {
    let obj = value.as_object()?;
    let get_str = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let parsed = obj
        .get("keystrokes")
        .and_then(Value::as_array)
        .map(|records| parse_events(records))
        .unwrap_or_default();

    Some(LoadedSession {
        session: Session {
            id: get_str("sessionId").unwrap_or_else(|| UNKNOWN.to_string()),
            mode: get_str("mode").unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: get_str("userAgent").unwrap_or_default(),
            keystrokes: parsed.events,
        },
        discarded: parsed.discarded,
    })
}

/// Parse a session export: a JSON array of session objects.
pub fn parse_sessions(json: &str) -> Result<Vec<LoadedSession>, BuildError> {
    let value: Value = serde_json::from_str(json)?;
    let entries = value
        .as_array()
        .ok_or_else(|| BuildError::InvalidInput("expected a JSON array of sessions".to_string()))?;

    let sessions: Vec<LoadedSession> = entries.iter().filter_map(parse_session).collect();
    let skipped = entries.len() - sessions.len();
    if skipped > 0 {
        tracing::warn!(skipped, "Ignored non-object entries in session export");
    }

    Ok(sessions)
}

/// Load a session export from disk.
pub fn load_sessions(path: &Path) -> Result<Vec<LoadedSession>, BuildError> {
    let content = std::fs::read_to_string(path)?;
    parse_sessions(&content)
}
