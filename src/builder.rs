//! Offline training-table builder.
//!
//! Turns logged sessions into one labeled CSV row per accepted key press,
//! using the same derivation as the online analyzer plus the session-wide
//! normalization only a finished session allows.

use crate::collector::loader::LoadedSession;
use crate::collector::types::Session;
use crate::core::layout::FeatureLayout;
use crate::core::{derive_features, DerivedFeatureRecord, RollingStatistics, SessionContext};
use crate::error::BuildError;
use crate::transparency::ProcessingLog;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Header of the training table.
pub const CSV_COLUMNS: [&str; 11] = [
    "session_id",
    "user_agent_type",
    "label",
    "char",
    "flight_time",
    "is_error",
    "sequence_idx",
    "flight_time_var",
    "flight_time_norm",
    "digraph",
    "dwell_time",
];

/// Derive the full batch feature set for one session.
pub fn build_session(session: &Session) -> Vec<DerivedFeatureRecord> {
    let context = SessionContext::from_session(session);
    let mut records = derive_features(&session.keystrokes, &context);
    RollingStatistics::apply_normalization(&mut records);
    records
}

/// Sample counts of a built table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub sessions: usize,
    pub records: usize,
    pub relaxed: usize,
    pub stressed: usize,
}

/// Rows of the training table, grouped by session in input order.
#[derive(Debug, Clone, Default)]
pub struct TrainingTable {
    pub records: Vec<DerivedFeatureRecord>,
    sessions: usize,
}

impl TrainingTable {
    pub fn build(sessions: &[Session]) -> Self {
        let mut table = Self::default();
        for session in sessions {
            table.push_session(session);
        }
        table
    }

    /// Build from loaded sessions, recording counts in `log`.
    pub fn build_logged(sessions: &[LoadedSession], log: &ProcessingLog) -> Self {
        let mut table = Self::default();
        for loaded in sessions {
            let received = loaded.session.keystrokes.len() + loaded.discarded;
            log.record_events(received as u64, loaded.discarded as u64);
            let derived = table.push_session(&loaded.session);
            log.record_session();
            log.record_derived(derived as u64);
        }
        table
    }

    fn push_session(&mut self, session: &Session) -> usize {
        let records = build_session(session);
        let derived = records.len();
        if derived == 0 {
            tracing::debug!(session_id = %session.id, "Session produced no key presses");
        }
        self.records.extend(records);
        self.sessions += 1;
        derived
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> BuildSummary {
        let stressed = self.records.iter().filter(|r| r.label == 1).count();
        BuildSummary {
            sessions: self.sessions,
            records: self.records.len(),
            relaxed: self.records.len() - stressed,
            stressed,
        }
    }

    /// Unscaled model inputs, one row per record, in layout order.
    pub fn feature_matrix(&self, layout: &FeatureLayout) -> Vec<Vec<f64>> {
        self.records.iter().map(|r| layout.raw_vector(r)).collect()
    }

    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
        for r in &self.records {
            let norm = r.flight_time_norm.map(|v| v.to_string()).unwrap_or_default();
            let dwell = r.dwell_time.map(|v| v.to_string()).unwrap_or_default();
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{},{},{}",
                csv_field(&r.session_id),
                r.client_class.as_str(),
                r.label,
                csv_field(&r.char),
                r.flight_time,
                r.is_error,
                r.sequence_idx,
                r.flight_time_var,
                norm,
                csv_field(&r.digraph),
                dwell
            )?;
        }
        writer.flush()
    }

    pub fn save(&self, path: &Path) -> Result<(), BuildError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        Ok(())
    }
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Location and spread of one timing measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
}

impl TimingSummary {
    pub fn from_values(values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let count = values.len();
        let mean = values.iter().mean();
        let std_dev = if count < 2 { 0.0 } else { values.iter().std_dev() };
        let median = Data::new(values).median();
        Self {
            count,
            mean,
            std_dev,
            median,
        }
    }
}

/// Flight and dwell statistics for all sessions sharing a mode tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStatistics {
    pub mode: String,
    pub sessions: usize,
    pub flight_time: TimingSummary,
    pub dwell_time: TimingSummary,
}

/// Per-mode timing statistics, ordered by mode tag.
pub fn mode_statistics(sessions: &[Session]) -> Vec<ModeStatistics> {
    let mut grouped: BTreeMap<&str, (usize, Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for session in sessions {
        let entry = grouped.entry(session.mode.as_str()).or_default();
        entry.0 += 1;
        for record in build_session(session) {
            entry.1.push(record.flight_time as f64);
            if let Some(dwell) = record.dwell_time {
                entry.2.push(dwell as f64);
            }
        }
    }

    grouped
        .into_iter()
        .map(|(mode, (count, flights, dwells))| ModeStatistics {
            mode: mode.to_string(),
            sessions: count,
            flight_time: TimingSummary::from_values(flights),
            dwell_time: TimingSummary::from_values(dwells),
        })
        .collect()
}
