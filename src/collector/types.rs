//! Keystroke event and session types.
//!
//! These mirror the records produced by the typing client: one object per
//! key transition, grouped into labeled sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded character reported when the client could not resolve the symbol.
pub const UNRESOLVED_CHAR: &str = "Unidentified";

/// Physical key identifier of the backspace key.
pub const BACKSPACE_KEY: &str = "Backspace";

/// Mode tag of sessions recorded under induced stress.
pub const STRESSED_MODE: &str = "stressed";

/// Largest timestamp magnitude accepted from JSON (2^53, the exact-integer range of a JS number).
pub const MAX_TIMESTAMP_MS: i64 = 1 << 53;

/// User-agent substrings that mark a mobile client (case-sensitive).
const MOBILE_MARKERS: [&str; 2] = ["Android", "iPhone"];

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventType {
    Down,
    Up,
}

impl KeyEventType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "down" => Some(KeyEventType::Down),
            "up" => Some(KeyEventType::Up),
            _ => None,
        }
    }
}

/// A single key transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    /// Timestamp in milliseconds
    pub time: i64,
    /// Press or release
    #[serde(rename = "type")]
    pub event_type: KeyEventType,
    /// Physical key identifier (e.g. `KeyA`, `Backspace`)
    pub key: String,
    /// Decoded character, when the client reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char: Option<String>,
}

impl KeystrokeEvent {
    pub fn down(time: i64, key: impl Into<String>, ch: impl Into<String>) -> Self {
        Self {
            time,
            event_type: KeyEventType::Down,
            key: key.into(),
            char: Some(ch.into()),
        }
    }

    pub fn up(time: i64, key: impl Into<String>) -> Self {
        Self {
            time,
            event_type: KeyEventType::Up,
            key: key.into(),
            char: None,
        }
    }

    /// Build an event from an untyped JSON record.
    ///
    /// Returns `None` when `time`, `type` or `key` is missing or unusable.
    /// Fractional timestamps are truncated toward zero. Timestamps beyond
    /// `MAX_TIMESTAMP_MS` in magnitude are unusable.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let time = match obj.get("time")? {
            Value::Number(n) => match n.as_i64() {
                Some(t) => t,
                None => {
                    let t = n.as_f64()?;
                    if !t.is_finite() {
                        return None;
                    }
                    t.trunc() as i64
                }
            },
            _ => return None,
        };
        if time.unsigned_abs() > MAX_TIMESTAMP_MS as u64 {
            return None;
        }

        let event_type = KeyEventType::parse(obj.get("type")?.as_str()?)?;
        let key = obj.get("key")?.as_str()?.to_string();
        let char = obj.get("char").and_then(Value::as_str).map(str::to_string);

        Some(Self {
            time,
            event_type,
            key,
            char,
        })
    }

    pub fn is_down(&self) -> bool {
        self.event_type == KeyEventType::Down
    }

    pub fn is_backspace(&self) -> bool {
        self.key == BACKSPACE_KEY
    }

    /// Whether the decoded character is the unresolved-symbol sentinel.
    pub fn is_unresolved(&self) -> bool {
        self.char.as_deref() == Some(UNRESOLVED_CHAR)
    }

    /// Decoded character, or the empty string when none was reported.
    pub fn char_or_empty(&self) -> &str {
        self.char.as_deref().unwrap_or("")
    }
}

/// Coarse client platform derived from the user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientClass {
    Mobile,
    Desktop,
}

impl ClientClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if MOBILE_MARKERS.iter().any(|m| user_agent.contains(m)) {
            ClientClass::Mobile
        } else {
            ClientClass::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientClass::Mobile => "mobile",
            ClientClass::Desktop => "desktop",
        }
    }
}

/// One recorded typing session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "sessionId")]
    pub id: String,
    /// Mode tag (`stressed`, `relaxed`, or another baseline tag)
    pub mode: String,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
    #[serde(default)]
    pub keystrokes: Vec<KeystrokeEvent>,
}

impl Session {
    /// Training label: 1 for stressed sessions, 0 otherwise.
    pub fn label(&self) -> u8 {
        u8::from(self.mode == STRESSED_MODE)
    }

    pub fn client_class(&self) -> ClientClass {
        ClientClass::from_user_agent(&self.user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_from_value() {
        let event =
            KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "char": "a", "time": 1700000000123i64}))
                .unwrap();
        assert_eq!(event, KeystrokeEvent::down(1700000000123, "KeyA", "a"));

        let up = KeystrokeEvent::from_value(&json!({"type": "up", "key": "KeyA", "time": 5})).unwrap();
        assert_eq!(up.char, None);
        assert!(!up.is_down());
    }

    #[test]
    fn test_event_from_value_truncates_fractional_time() {
        let event = KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": 12.9})).unwrap();
        assert_eq!(event.time, 12);
    }

    #[test]
    fn test_malformed_events_rejected() {
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA"})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "press", "key": "KeyA", "time": 1})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "time": 1})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": "1"})).is_none());
        assert!(KeystrokeEvent::from_value(&json!("down")).is_none());
    }

    #[test]
    fn test_out_of_range_time_rejected() {
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": -1e30})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": 1e30})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": i64::MAX})).is_none());
        assert!(KeystrokeEvent::from_value(&json!({"type": "down", "key": "KeyA", "time": u64::MAX})).is_none());

        let edge = KeystrokeEvent::from_value(&json!({"type": "up", "key": "KeyA", "time": -MAX_TIMESTAMP_MS})).unwrap();
        assert_eq!(edge.time, -MAX_TIMESTAMP_MS);
    }

    #[test]
    fn test_backspace_and_sentinel() {
        assert!(KeystrokeEvent::down(0, "Backspace", "Backspace").is_backspace());
        assert!(!KeystrokeEvent::down(0, "KeyB", "b").is_backspace());
        assert!(KeystrokeEvent::down(0, "MobileInput", UNRESOLVED_CHAR).is_unresolved());
    }

    #[test]
    fn test_client_class() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8)";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";
        assert_eq!(ClientClass::from_user_agent(iphone), ClientClass::Mobile);
        assert_eq!(ClientClass::from_user_agent(android), ClientClass::Mobile);
        assert_eq!(ClientClass::from_user_agent(mac), ClientClass::Desktop);
        // Matching is case-sensitive.
        assert_eq!(ClientClass::from_user_agent("android"), ClientClass::Desktop);
    }

    #[test]
    fn test_session_label() {
        let mut session = Session {
            mode: "stressed".to_string(),
            ..Default::default()
        };
        assert_eq!(session.label(), 1);
        session.mode = "relaxed".to_string();
        assert_eq!(session.label(), 0);
        session.mode = "baseline".to_string();
        assert_eq!(session.label(), 0);
    }
}
