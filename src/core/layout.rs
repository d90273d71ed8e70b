//! The canonical model input vector.
//!
//! Training rows and live windows are both assembled here, so the column
//! names, order, and scaling treatment cannot drift between the two paths.

use crate::core::features::DerivedFeatureRecord;

/// How a column is presented to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTreatment {
    /// Standardized with the fitted scaler
    Scaled,
    /// Passed through unchanged
    Raw,
}

/// One column of the model input.
#[derive(Debug, Clone, Copy)]
pub struct FeatureColumn {
    pub name: &'static str,
    pub treatment: ColumnTreatment,
    extract: fn(&DerivedFeatureRecord) -> f64,
}

impl FeatureColumn {
    pub fn value(&self, record: &DerivedFeatureRecord) -> f64 {
        (self.extract)(record)
    }
}

/// Number of columns in the model input.
pub const FEATURE_COUNT: usize = 3;

/// `flight_time` and `flight_time_var` are scaled; `is_error` stays 0/1.
///
/// `flight_time_norm` is deliberately absent: it depends on whole-session
/// statistics that a live prefix cannot reproduce.
pub static CANONICAL_COLUMNS: [FeatureColumn; FEATURE_COUNT] = [
    FeatureColumn {
        name: "flight_time",
        treatment: ColumnTreatment::Scaled,
        extract: flight_time,
    },
    FeatureColumn {
        name: "flight_time_var",
        treatment: ColumnTreatment::Scaled,
        extract: flight_time_var,
    },
    FeatureColumn {
        name: "is_error",
        treatment: ColumnTreatment::Raw,
        extract: is_error,
    },
];

fn flight_time(r: &DerivedFeatureRecord) -> f64 {
    r.flight_time as f64
}

fn flight_time_var(r: &DerivedFeatureRecord) -> f64 {
    r.flight_time_var
}

fn is_error(r: &DerivedFeatureRecord) -> f64 {
    f64::from(r.is_error)
}

/// Ordered column definitions shared by the builder and the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct FeatureLayout {
    columns: &'static [FeatureColumn],
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self::canonical()
    }
}

impl FeatureLayout {
    pub fn canonical() -> Self {
        Self {
            columns: &CANONICAL_COLUMNS,
        }
    }

    pub fn columns(&self) -> &'static [FeatureColumn] {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_string()).collect()
    }

    /// Names of the scaled columns, in layout order. A scaler must be fit on exactly these.
    pub fn scaled_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.treatment == ColumnTreatment::Scaled)
            .map(|c| c.name.to_string())
            .collect()
    }

    /// Unscaled feature vector of one record.
    pub fn raw_vector(&self, record: &DerivedFeatureRecord) -> Vec<f64> {
        self.columns.iter().map(|c| c.value(record)).collect()
    }
}
