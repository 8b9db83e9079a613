//! Outcomes of LEARN and DROP_MODEL transactions.

use serde::{Deserialize, Serialize};

use crate::data::WorkingInput;
use crate::metadata::ModelMetadata;

pub const STATUS_COLUMN: &str = "Status";

/// Message recorded when extraction yields nothing to learn from.
pub const NO_RESULTS: &str = "No results for this query.";

/// Single-column status result of LEARN and DROP_MODEL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainOutput {
    pub status: String,
}

impl TrainOutput {
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            status: message.into(),
        }
    }

    /// Tabular view: one `Status` column with one row.
    pub fn to_rows(&self) -> WorkingInput {
        WorkingInput::new(
            vec![STATUS_COLUMN.to_string()],
            vec![vec![serde_json::Value::String(self.status.clone())]],
        )
    }
}

/// How the training orchestrator ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LearnOutcome {
    Trained,
    /// Extraction produced no rows; nothing was persisted.
    BadQuery(String),
}

/// What a finished learn hands back to whoever awaits it.
#[derive(Clone, Debug)]
pub struct LearnReport {
    pub outcome: LearnOutcome,
    pub metadata: ModelMetadata,
}
