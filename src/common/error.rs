//! Error handling primitives shared across the core.
//!
//! Plugin seams (phases, backends, validator codecs) report failures as
//! `anyhow::Error`; the orchestrators wrap them exactly once into a
//! [`TxError`] so callers only ever match on one enum.

use thiserror::Error;

use crate::phases::PhaseName;

/// Stable error codes for callers on the other side of a process boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// A phase module could not be resolved or failed while running.
    PhaseLoad = 1,
    /// The model backend failed inside `train()` or `predict()`.
    Backend = 2,
    /// No backend is registered under the requested identifier.
    UnsupportedBackend = 3,
    /// Requested model metadata was not available.
    ModelMissing = 4,
    /// Input failed validation.
    InvalidInput = 5,
    /// Persistence layer failure.
    Storage = 6,
    /// Catch-all for bugs and unavailable paths.
    Internal = 7,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("could not run phase {phase}: {reason}")]
    PhaseLoad { phase: PhaseName, reason: String },

    #[error("backend '{backend}' failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("unsupported model backend '{0}'")]
    UnsupportedBackend(String),

    #[error("no metadata found for model '{0}'")]
    MetadataNotFound(String),

    #[error("model '{model}' is not trained (status {phase})")]
    ModelNotReady { model: String, phase: String },

    #[error("validator for column '{column}' is unusable: {reason}")]
    Validator { column: String, reason: String },

    #[error("confidence column '{0}' collides with an existing column")]
    ConfidenceColumnCollision(String),

    #[error("no select executor is registered")]
    SelectUnavailable,

    #[error("select failed: {0}")]
    Select(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background worker went away before reporting")]
    WorkerGone,

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Result alias used throughout the crate.
pub type TxResult<T> = Result<T, TxError>;

impl TxError {
    /// Wrap a plugin failure raised by a phase.
    pub fn phase(phase: PhaseName, err: anyhow::Error) -> Self {
        Self::PhaseLoad {
            phase,
            reason: format!("{err:#}"),
        }
    }

    /// Wrap a plugin failure raised by a backend.
    pub fn backend(backend: &str, reason: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    /// Turn a caught panic payload into an error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }

    /// IO helper used by the filesystem repositories.
    pub fn io(context: &str, err: std::io::Error) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            TxError::PhaseLoad { .. } => ErrorCode::PhaseLoad,
            TxError::Backend { .. } => ErrorCode::Backend,
            TxError::UnsupportedBackend(_) => ErrorCode::UnsupportedBackend,
            TxError::MetadataNotFound(_) | TxError::ModelNotReady { .. } => {
                ErrorCode::ModelMissing
            }
            TxError::InvalidInput(_) | TxError::ConfidenceColumnCollision(_) => {
                ErrorCode::InvalidInput
            }
            TxError::Storage(_) | TxError::Serialization(_) => ErrorCode::Storage,
            TxError::Validator { .. }
            | TxError::SelectUnavailable
            | TxError::Select(_)
            | TxError::Config(_)
            | TxError::WorkerGone
            | TxError::Panicked(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Ok as u32, 0);
        assert_eq!(ErrorCode::PhaseLoad as u32, 1);
        assert_eq!(ErrorCode::Backend as u32, 2);
        assert_eq!(ErrorCode::UnsupportedBackend as u32, 3);
        assert_eq!(ErrorCode::ModelMissing as u32, 4);
        assert_eq!(ErrorCode::InvalidInput as u32, 5);
        assert_eq!(ErrorCode::Storage as u32, 6);
        assert_eq!(ErrorCode::Internal as u32, 7);
    }

    #[test]
    fn variants_map_to_codes() {
        assert_eq!(
            TxError::UnsupportedBackend("nope".into()).code(),
            ErrorCode::UnsupportedBackend
        );
        assert_eq!(
            TxError::MetadataNotFound("m".into()).code(),
            ErrorCode::ModelMissing
        );
        let err = TxError::phase(PhaseName::StatsGenerator, anyhow::anyhow!("boom"));
        assert_eq!(err.code(), ErrorCode::PhaseLoad);
        assert!(err.to_string().contains("StatsGenerator"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = TxError::from_panic(Box::new("static str"));
        assert!(matches!(err, TxError::Panicked(ref m) if m == "static str"));

        let err = TxError::from_panic(Box::new(format!("owned {}", 1)));
        assert!(matches!(err, TxError::Panicked(ref m) if m == "owned 1"));

        let err = TxError::from_panic(Box::new(17u8));
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
