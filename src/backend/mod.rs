//! Pluggable model backends, selected by string identifier.
//!
//! Adding a backend means registering a new identifier on the session; the
//! orchestrators never name a concrete engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::error::{TxError, TxResult};
use crate::data::Cell;
use crate::transaction::{Session, TxContext};

/// Predicted values per predict-column, aligned with extraction row order.
pub type Predictions = HashMap<String, Vec<Cell>>;

/// Interface for engines that can train and predict.
pub trait ModelBackend: Send + Sync {
    /// Train on the extracted input. Learned artefacts are written onto the
    /// context's metadata record.
    fn train(&self, session: &Session, ctx: &mut TxContext) -> anyhow::Result<()>;

    /// Predict every predict-column for the extracted input.
    fn predict(&self, session: &Session, ctx: &TxContext) -> anyhow::Result<Predictions>;
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ModelBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, backend: Arc<dyn ModelBackend>) {
        let id = id.into();
        if self.backends.insert(id.clone(), backend).is_some() {
            tracing::warn!(backend = %id, "replaced registered model backend");
        }
    }

    pub fn with(mut self, id: impl Into<String>, backend: impl ModelBackend + 'static) -> Self {
        self.register(id, Arc::new(backend));
        self
    }

    /// Look up a backend. An unset or unknown identifier is an explicit error.
    pub fn resolve(&self, id: Option<&str>) -> TxResult<(String, Arc<dyn ModelBackend>)> {
        let id = id.unwrap_or_default();
        self.backends
            .get(id)
            .map(|backend| (id.to_string(), Arc::clone(backend)))
            .ok_or_else(|| TxError::UnsupportedBackend(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Train through the backend named on the context's record.
pub fn train(session: &Session, ctx: &mut TxContext) -> TxResult<()> {
    let (id, backend) = session
        .backends()
        .resolve(ctx.metadata.model_backend.as_deref())?;
    tracing::debug!(backend = %id, model = %ctx.metadata.model_name, "backend train");
    backend
        .train(session, ctx)
        .map_err(|err| TxError::backend(&id, format!("{err:#}")))
}

/// Predict through the backend named on the context's record and check that
/// every predict-column came back with exactly one value per extracted row.
pub fn predict(session: &Session, ctx: &TxContext) -> TxResult<Predictions> {
    let (id, backend) = session
        .backends()
        .resolve(ctx.metadata.model_backend.as_deref())?;
    tracing::debug!(backend = %id, model = %ctx.metadata.model_name, "backend predict");
    let predictions = backend
        .predict(session, ctx)
        .map_err(|err| TxError::backend(&id, format!("{err:#}")))?;

    let rows = ctx.input.row_count();
    for column in ctx.metadata.predict_columns() {
        match predictions.get(column) {
            None => {
                return Err(TxError::backend(
                    &id,
                    format!("no predictions for column '{column}'"),
                ))
            }
            Some(values) if values.len() != rows => {
                return Err(TxError::backend(
                    &id,
                    format!(
                        "column '{column}' has {} predictions for {rows} rows",
                        values.len()
                    ),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(predictions)
}
