//! Prediction results: predicted columns merged with per-row evaluations.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::{Cell, WorkingInput};
use crate::validator::Evaluation;

/// Name of the flat confidence column derived from a predict-column.
pub fn confidence_column(column: &str) -> String {
    format!("{column}_confidence")
}

/// Assembled result of a PREDICT transaction.
///
/// `data` holds one list per output column, all of the same length and
/// aligned by extraction row. Confidence columns hold each [`Evaluation`]
/// serialized; `evaluations` holds the same values structured.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PredictOutput {
    pub columns: Vec<String>,
    pub data: HashMap<String, Vec<Cell>>,
    pub evaluations: HashMap<String, Vec<Evaluation>>,
}

impl PredictOutput {
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.data.get(name).map(Vec::as_slice)
    }

    pub fn evaluations_for(&self, column: &str) -> Option<&[Evaluation]> {
        self.evaluations.get(column).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .and_then(|c| self.data.get(c))
            .map_or(0, Vec::len)
    }

    /// Row-major view in output column order. Cells missing from `data`
    /// come out as null.
    pub fn to_rows(&self) -> WorkingInput {
        let rows = (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| {
                        self.data
                            .get(c)
                            .and_then(|values| values.get(row))
                            .cloned()
                            .unwrap_or(Cell::Null)
                    })
                    .collect()
            })
            .collect();
        WorkingInput::new(self.columns.clone(), rows)
    }
}

/// How the prediction orchestrator ended.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictOutcome {
    /// Extraction produced no columns; the raw extraction is the result.
    Passthrough(WorkingInput),
    Predicted(PredictOutput),
}
