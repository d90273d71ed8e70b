//! Keystroke session input for TypeState.
//!
//! This module defines the raw event and session types shared by the batch
//! builder and the online analyzer, and the lenient JSON loading used by both.

pub mod loader;
pub mod types;

// Re-export commonly used types
pub use loader::{load_sessions, parse_events, parse_sessions, LoadedSession, ParsedEvents};
pub use types::{
    ClientClass, KeyEventType, KeystrokeEvent, Session, BACKSPACE_KEY, MAX_TIMESTAMP_MS,
    STRESSED_MODE, UNRESOLVED_CHAR,
};
