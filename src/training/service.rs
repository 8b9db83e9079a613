//! Training orchestrator: extraction → stats → train → analysis → persistence.

use std::panic::{self, AssertUnwindSafe};

use crate::backend;
use crate::common::error::{TxError, TxResult};
use crate::common::time;
use crate::metadata::{ModelMetadata, ModelStatus, RequestType};
use crate::phases::{call_phase, PhaseName};
use crate::transaction::{Session, TxContext};

use super::domain::{LearnOutcome, NO_RESULTS};

/// Run a LEARN against `ctx`.
///
/// An empty extraction is reported as [`LearnOutcome::BadQuery`] with nothing
/// persisted. Any failure after that point leaves the record in
/// [`ModelStatus::Error`] with the error text, persists it so background
/// callers can observe it, and is returned to the caller. Panics raised by
/// phases or the backend count as failures.
pub fn execute_learn(session: &Session, ctx: &mut TxContext) -> TxResult<LearnOutcome> {
    ctx.metadata.current_phase = Some(ModelStatus::Preparing);
    call_phase(session, ctx, PhaseName::DataExtractor)?;

    if ctx.input.is_empty_extraction() {
        ctx.metadata.request_type = Some(RequestType::BadQuery);
        ctx.metadata.error_msg = Some(NO_RESULTS.to_string());
        tracing::warn!(model = %ctx.metadata.model_name, "learn extraction returned no rows");
        return Ok(LearnOutcome::BadQuery(NO_RESULTS.to_string()));
    }

    // A panicking phase or backend must still leave the record in Error.
    let result = panic::catch_unwind(AssertUnwindSafe(|| train_and_persist(session, ctx)))
        .unwrap_or_else(|payload| Err(TxError::from_panic(payload)));

    match result {
        Ok(()) => {
            tracing::info!(
                model = %ctx.metadata.model_name,
                rows = ctx.input.row_count(),
                "model trained"
            );
            Ok(LearnOutcome::Trained)
        }
        Err(error) => {
            ctx.metadata.current_phase = Some(ModelStatus::Error);
            ctx.metadata.error_msg = Some(error.to_string());
            ctx.metadata.train_ended_ms = Some(time::now_ms());
            tracing::error!(model = %ctx.metadata.model_name, %error, "learn failed");

            if let Err(persist_error) = session.metadata_repo().update(&ctx.metadata.stripped()) {
                tracing::error!(
                    model = %ctx.metadata.model_name,
                    error = %persist_error,
                    "could not persist failed learn state"
                );
            }
            Err(error)
        }
    }
}

fn train_and_persist(session: &Session, ctx: &mut TxContext) -> TxResult<()> {
    let repo = session.metadata_repo();
    repo.delete(&ctx.metadata.model_name)?;

    ctx.metadata.current_phase = Some(ModelStatus::Analyzing);
    ctx.metadata.columns = Some(ctx.input.columns.clone());
    ctx.metadata.row_count = Some(ctx.input.row_count() as u64);
    ctx.metadata.error_msg = None;
    ctx.metadata.train_started_ms = Some(time::now_ms());
    ctx.metadata.train_ended_ms = None;
    checkpoint(session, &ctx.metadata)?;

    call_phase(session, ctx, PhaseName::StatsGenerator)?;

    ctx.metadata.current_phase = Some(ModelStatus::Training);
    checkpoint(session, &ctx.metadata)?;
    backend::train(session, ctx)?;

    call_phase(session, ctx, PhaseName::ModelAnalyzer)?;

    ctx.metadata.current_phase = Some(ModelStatus::Trained);
    ctx.metadata.train_ended_ms = Some(time::now_ms());
    // Raw dataset references have no stored form.
    ctx.metadata.from_data = None;
    ctx.metadata.test_from_data = None;

    repo.insert(&ctx.metadata)?;
    repo.update(&ctx.metadata)?;
    Ok(())
}

/// Publish the current status so pollers can follow a running learn.
fn checkpoint(session: &Session, metadata: &ModelMetadata) -> TxResult<()> {
    tracing::debug!(
        model = %metadata.model_name,
        phase = ?metadata.current_phase,
        "learn checkpoint"
    );
    session.metadata_repo().update(&metadata.stripped())
}
