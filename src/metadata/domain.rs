//! Persistent model descriptor and the repository contracts that store it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{TxError, TxResult};

/// Kind of request driving a transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Learn,
    Predict,
    DropModel,
    NormalSelect,
    BadQuery,
}

/// Lifecycle status of a model, observable through the persisted record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    Preparing,
    Analyzing,
    Training,
    Trained,
    Error,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelStatus::Preparing => "preparing",
            ModelStatus::Analyzing => "analyzing",
            ModelStatus::Training => "training",
            ModelStatus::Trained => "trained",
            ModelStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Serialized probabilistic validator for one predict-column.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorBlob(pub Vec<u8>);

impl ValidatorBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ValidatorBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Persistent descriptor of a model: identity, status, schema and validators.
///
/// Every field except the identity key is optional so that a request record
/// can carry only what it wants to override; see [`ModelMetadata::merge_over`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<ModelStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validators: Option<BTreeMap<String, ValidatorBlob>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Raw dataset reference used to extract training rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_data: Option<serde_json::Value>,
    /// Raw dataset reference used to extract test rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_from_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_started_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_ended_ms: Option<u64>,
}

impl ModelMetadata {
    pub fn new(model_name: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            model_name: model_name.into(),
            request_type: Some(request_type),
            ..Self::default()
        }
    }

    /// Request type, treating a missing one as a bad query.
    pub fn request_type(&self) -> RequestType {
        self.request_type.unwrap_or(RequestType::BadQuery)
    }

    pub fn predict_columns(&self) -> &[String] {
        self.predict_columns.as_deref().unwrap_or_default()
    }

    pub fn validator(&self, column: &str) -> Option<&ValidatorBlob> {
        self.validators.as_ref().and_then(|v| v.get(column))
    }

    /// Merge this request record over a persisted one.
    ///
    /// For every field the value on `self` wins when it is `Some`; otherwise
    /// the persisted value is used. The identity key always comes from `self`.
    pub fn merge_over(self, persisted: ModelMetadata) -> ModelMetadata {
        ModelMetadata {
            model_name: self.model_name,
            request_type: self.request_type.or(persisted.request_type),
            current_phase: self.current_phase.or(persisted.current_phase),
            columns: self.columns.or(persisted.columns),
            predict_columns: self.predict_columns.or(persisted.predict_columns),
            validators: self.validators.or(persisted.validators),
            model_backend: self.model_backend.or(persisted.model_backend),
            error_msg: self.error_msg.or(persisted.error_msg),
            from_data: self.from_data.or(persisted.from_data),
            test_from_data: self.test_from_data.or(persisted.test_from_data),
            row_count: self.row_count.or(persisted.row_count),
            train_started_ms: self.train_started_ms.or(persisted.train_started_ms),
            train_ended_ms: self.train_ended_ms.or(persisted.train_ended_ms),
        }
    }

    /// Copy of the record without raw dataset references, fit for persisting.
    pub fn stripped(&self) -> ModelMetadata {
        ModelMetadata {
            from_data: None,
            test_from_data: None,
            ..self.clone()
        }
    }

    /// Reject identity keys that cannot name a stored record.
    pub fn validate_key(&self) -> TxResult<()> {
        validate_model_name(&self.model_name)
    }
}

pub fn validate_model_name(name: &str) -> TxResult<()> {
    if name.trim().is_empty() {
        return Err(TxError::InvalidInput("model name is empty".to_string()));
    }
    if name
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
        || name == "."
        || name == ".."
    {
        return Err(TxError::InvalidInput(format!(
            "model name '{name}' contains reserved characters"
        )));
    }
    Ok(())
}

/// Per-column statistics produced while analysing the training data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub model_name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, serde_json::Value>,
}

/// Repository contract for metadata records. Every call is idempotent.
pub trait MetadataRepo: Send + Sync {
    fn delete(&self, model_name: &str) -> TxResult<()>;
    fn find_one(&self, model_name: &str) -> TxResult<Option<ModelMetadata>>;
    fn insert(&self, record: &ModelMetadata) -> TxResult<()>;
    fn update(&self, record: &ModelMetadata) -> TxResult<()>;
}

/// Repository contract for statistics records.
pub trait StatsRepo: Send + Sync {
    fn delete(&self, model_name: &str) -> TxResult<()>;
    fn get(&self, model_name: &str) -> TxResult<Option<ModelStats>>;
    fn put(&self, stats: &ModelStats) -> TxResult<()>;
}
