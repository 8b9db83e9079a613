//! Transaction: one request-scoped execution of learn, predict, drop or
//! select against a model.
//!
//! Building a [`Transaction`] runs it. The request type on the incoming
//! record picks exactly one path:
//!
//! | request        | path                                               |
//! |----------------|----------------------------------------------------|
//! | `BAD_QUERY`    | flagged as errored, nothing runs                   |
//! | `DROP_MODEL`   | metadata and stats deleted                         |
//! | `LEARN`        | training orchestrator, inline or on the learn pool |
//! | `PREDICT`      | prediction orchestrator                            |
//! | `NORMAL_SELECT`| session's select executor                          |

use crate::common::error::{TxError, TxResult};
use crate::data::WorkingInput;
use crate::inference::{self, PredictOutcome, PredictOutput};
use crate::metadata::{ModelMetadata, RequestType};
use crate::training::{self, LearnOutcome, LearnReport, TrainOutput};

use super::context::TxContext;
use super::session::Session;
use super::workers::JobHandle;

/// Handle to a LEARN running on the background pool.
pub type LearnHandle = JobHandle<TxResult<LearnReport>>;

/// Terminal output of a transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TransactionOutput {
    #[default]
    None,
    Train(TrainOutput),
    Predict(PredictOutput),
    Rows(WorkingInput),
}

pub struct Transaction {
    request_type: RequestType,
    ctx: TxContext,
    output: TransactionOutput,
    error: Option<String>,
    learn: Option<LearnHandle>,
}

impl Transaction {
    /// Run `request` against `session` and return the finished transaction.
    ///
    /// In background learn mode this returns as soon as the learn is queued;
    /// the handle is available through [`Transaction::take_learn_handle`].
    pub fn new(session: &Session, request: ModelMetadata) -> TxResult<Self> {
        let mut tx = Transaction {
            request_type: request.request_type(),
            ctx: TxContext::new(request),
            output: TransactionOutput::None,
            error: None,
            learn: None,
        };
        tx.run(session)?;
        Ok(tx)
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn output(&self) -> &TransactionOutput {
        &self.output
    }

    pub fn into_output(self) -> TransactionOutput {
        self.output
    }

    /// The in-memory metadata record as this transaction left it.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.ctx.metadata
    }

    pub fn take_learn_handle(&mut self) -> Option<LearnHandle> {
        self.learn.take()
    }

    fn run(&mut self, session: &Session) -> TxResult<()> {
        if self.request_type != RequestType::BadQuery {
            self.ctx.metadata.validate_key()?;
        }
        tracing::info!(
            model = %self.ctx.metadata.model_name,
            request = ?self.request_type,
            "transaction start"
        );

        match self.request_type {
            RequestType::BadQuery => self.execute_bad_query(),
            RequestType::DropModel => self.execute_drop_model(session)?,
            RequestType::Learn => self.execute_learn(session)?,
            RequestType::Predict => self.execute_predict(session)?,
            RequestType::NormalSelect => self.execute_normal_select(session)?,
        }

        tracing::info!(
            model = %self.ctx.metadata.model_name,
            request = ?self.request_type,
            error = self.is_error(),
            "transaction done"
        );
        Ok(())
    }

    fn execute_bad_query(&mut self) {
        let message = self
            .ctx
            .metadata
            .error_msg
            .clone()
            .unwrap_or_else(|| "bad query".to_string());
        tracing::error!(model = %self.ctx.metadata.model_name, %message, "bad query");
        self.error = Some(message);
    }

    fn execute_drop_model(&mut self, session: &Session) -> TxResult<()> {
        let name = self.ctx.metadata.model_name.clone();
        session.gate().with_model(&name, || -> TxResult<()> {
            session.metadata_repo().delete(&name)?;
            session.stats_repo().delete(&name)
        })?;
        self.output =
            TransactionOutput::Train(TrainOutput::status(format!("Model {name} deleted.")));
        Ok(())
    }

    fn execute_learn(&mut self, session: &Session) -> TxResult<()> {
        let name = self.ctx.metadata.model_name.clone();
        if self.ctx.metadata.model_backend.is_none() {
            self.ctx.metadata.model_backend = session.cfg().default_backend.clone();
        }
        self.output =
            TransactionOutput::Train(TrainOutput::status(format!("Model {name} training.")));

        if let Some(pool) = session.learn_pool() {
            let job_session = session.clone();
            let mut ctx = TxContext::new(self.ctx.metadata.clone());
            let handle = pool.submit(move || -> TxResult<LearnReport> {
                let outcome = learn_gated(&job_session, &mut ctx)?;
                Ok(LearnReport {
                    outcome,
                    metadata: ctx.metadata,
                })
            })?;
            tracing::debug!(model = %name, "learn queued on background pool");
            self.learn = Some(handle);
            return Ok(());
        }

        if let LearnOutcome::BadQuery(message) = learn_gated(session, &mut self.ctx)? {
            self.request_type = RequestType::BadQuery;
            self.error = Some(message);
        }
        Ok(())
    }

    fn execute_predict(&mut self, session: &Session) -> TxResult<()> {
        let name = self.ctx.metadata.model_name.clone();
        let ctx = &mut self.ctx;
        let outcome = session
            .gate()
            .with_model(&name, || inference::execute_predict(session, ctx))?;

        self.output = match outcome {
            PredictOutcome::Passthrough(rows) => TransactionOutput::Rows(rows),
            PredictOutcome::Predicted(output) => TransactionOutput::Predict(output),
        };
        Ok(())
    }

    fn execute_normal_select(&mut self, session: &Session) -> TxResult<()> {
        let executor = session.select_executor().ok_or_else(|| {
            tracing::error!(model = %self.ctx.metadata.model_name, "no select executor registered");
            TxError::SelectUnavailable
        })?;
        let rows = executor
            .execute(session, &mut self.ctx)
            .map_err(|err| TxError::Select(format!("{err:#}")))?;
        self.output = TransactionOutput::Rows(rows);
        Ok(())
    }
}

fn learn_gated(session: &Session, ctx: &mut TxContext) -> TxResult<LearnOutcome> {
    let name = ctx.metadata.model_name.clone();
    session
        .gate()
        .with_model(&name, || training::execute_learn(session, ctx))
}
