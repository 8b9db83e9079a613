//! Row-oriented working data produced by extraction and shared between phases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One cell of extracted or predicted data. `Value::Null` means "absent".
pub type Cell = serde_json::Value;

/// Extracted input: ordered column names and ordered rows of cells.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingInput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl WorkingInput {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when extraction produced nothing a model could learn from:
    /// no rows at all, or a first row without cells.
    pub fn is_empty_extraction(&self) -> bool {
        self.rows.first().map_or(true, |row| row.is_empty())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Opaque intermediate state passed between phases of one transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelData {
    entries: BTreeMap<String, serde_json::Value>,
}

impl ModelData {
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
