//! Fixed-size inference window over the most recent key presses.
//!
//! The window is rebuilt from the full derived history on every analysis;
//! nothing about it outlives one request.

use crate::core::features::DerivedFeatureRecord;
use crate::core::layout::{ColumnTreatment, FeatureLayout};
use crate::error::AnalyzerError;
use crate::model::scaler::ScalerParameters;
use ndarray::{Array2, ArrayView2};

/// Number of key presses the classifier sees at once.
pub const WINDOW_SIZE: usize = 20;

/// The last `capacity` records, or `None` when fewer are available.
pub fn latest_records(records: &[DerivedFeatureRecord], capacity: usize) -> Option<&[DerivedFeatureRecord]> {
    if capacity == 0 || records.len() < capacity {
        return None;
    }
    Some(&records[records.len() - capacity..])
}

/// Scaled feature vectors of the most recent key presses, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceWindow {
    rows: Array2<f64>,
}

impl InferenceWindow {
    /// Assemble a window from exactly the records given.
    ///
    /// Scaled columns go through `scaler` (which must match `layout`);
    /// raw columns keep their value and position.
    pub fn assemble(
        records: &[DerivedFeatureRecord],
        layout: &FeatureLayout,
        scaler: &ScalerParameters,
    ) -> Result<Self, AnalyzerError> {
        if records.is_empty() || layout.is_empty() {
            return Err(AnalyzerError::FeatureAssembly(
                "cannot assemble an empty window".to_string(),
            ));
        }
        scaler
            .ensure_layout(layout)
            .map_err(|e| AnalyzerError::FeatureAssembly(e.to_string()))?;

        let mut flat = Vec::with_capacity(records.len() * layout.len());
        for record in records {
            let raw = layout.raw_vector(record);
            let to_scale: Vec<f64> = layout
                .columns()
                .iter()
                .zip(&raw)
                .filter(|(c, _)| c.treatment == ColumnTreatment::Scaled)
                .map(|(_, v)| *v)
                .collect();
            let mut scaled = scaler
                .transform(&to_scale)
                .ok_or_else(|| {
                    AnalyzerError::FeatureAssembly(format!(
                        "scaler expects {} values, record {} produced {}",
                        scaler.len(),
                        record.sequence_idx,
                        to_scale.len()
                    ))
                })?
                .into_iter();

            for (column, value) in layout.columns().iter().zip(raw) {
                let v = match column.treatment {
                    ColumnTreatment::Scaled => scaled.next().unwrap_or(f64::NAN),
                    ColumnTreatment::Raw => value,
                };
                if !v.is_finite() {
                    return Err(AnalyzerError::FeatureAssembly(format!(
                        "non-finite {} at sequence index {}",
                        column.name, record.sequence_idx
                    )));
                }
                flat.push(v);
            }
        }

        let rows = Array2::from_shape_vec((records.len(), layout.len()), flat)
            .map_err(|e| AnalyzerError::FeatureAssembly(e.to_string()))?;
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }

    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.rows.row(idx).to_vec()
    }
}
