//! Prediction orchestrator: metadata merge → extraction → backend predict →
//! confidence merge.

use std::collections::HashSet;

use crate::backend::{self, Predictions};
use crate::common::error::{TxError, TxResult};
use crate::data::WorkingInput;
use crate::metadata::{ModelMetadata, ModelStatus};
use crate::phases::{call_phase, PhaseName};
use crate::transaction::{Session, TxContext};
use crate::validator::ValidatorCodec;

use super::domain::{confidence_column, PredictOutcome, PredictOutput};

/// Run a PREDICT against `ctx`. Only a record in [`ModelStatus::Trained`]
/// can serve predictions. Nothing is persisted.
pub fn execute_predict(session: &Session, ctx: &mut TxContext) -> TxResult<PredictOutcome> {
    let name = ctx.metadata.model_name.clone();
    let persisted = session.metadata_repo().find_one(&name)?.ok_or_else(|| {
        tracing::error!(model = %name, "no metadata found for this model");
        TxError::MetadataNotFound(name.clone())
    })?;
    if persisted.current_phase != Some(ModelStatus::Trained) {
        let phase = persisted
            .current_phase
            .map_or_else(|| "unknown".to_string(), |p| p.to_string());
        tracing::error!(model = %name, %phase, "model is not trained");
        return Err(TxError::ModelNotReady { model: name, phase });
    }
    ctx.metadata = std::mem::take(&mut ctx.metadata).merge_over(persisted);

    call_phase(session, ctx, PhaseName::DataExtractor)?;

    if ctx.input.columns.is_empty() {
        tracing::info!(model = %name, "extraction has no columns, returning it unchanged");
        return Ok(PredictOutcome::Passthrough(std::mem::take(&mut ctx.input)));
    }

    let predictions = backend::predict(session, ctx)?;
    let output = assemble(
        session.validator_codec(),
        &ctx.metadata,
        &ctx.input,
        predictions,
    )?;

    tracing::info!(
        model = %name,
        rows = output.row_count(),
        predicted = ?ctx.metadata.predict_columns(),
        "prediction assembled"
    );
    Ok(PredictOutcome::Predicted(output))
}

/// Merge extracted input, predicted values and per-row evaluations.
///
/// Non-predicted columns echo the input exactly. Each predict-column is
/// replaced by its predictions and gains a `<column>_confidence` column plus
/// an evaluation list, both filled from one validator call per row.
pub fn assemble(
    codec: &dyn ValidatorCodec,
    metadata: &ModelMetadata,
    input: &WorkingInput,
    mut predictions: Predictions,
) -> TxResult<PredictOutput> {
    check_shape(input)?;

    let rows = input.row_count();
    let predict_columns = metadata.predict_columns();
    let mut output = PredictOutput {
        columns: input.columns.clone(),
        ..PredictOutput::default()
    };

    for (index, column) in input.columns.iter().enumerate() {
        let values = input.rows.iter().map(|row| row[index].clone()).collect();
        output.data.insert(column.clone(), values);
    }

    // Presence of every non-predicted feature, per row, in extraction order.
    let feature_indexes: Vec<usize> = input
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !predict_columns.contains(*c))
        .map(|(i, _)| i)
        .collect();
    let presence: Vec<Vec<bool>> = input
        .rows
        .iter()
        .map(|row| feature_indexes.iter().map(|&i| !row[i].is_null()).collect())
        .collect();

    // TODO: cache decoded validators per (model, train_ended_ms) once codecs get expensive.
    for column in predict_columns {
        let blob = metadata.validator(column).ok_or_else(|| TxError::Validator {
            column: column.clone(),
            reason: "no validator persisted".to_string(),
        })?;
        let validator = codec.decode(blob).map_err(|err| TxError::Validator {
            column: column.clone(),
            reason: format!("{err:#}"),
        })?;

        let predicted = predictions.remove(column).ok_or_else(|| {
            TxError::backend(
                metadata.model_backend.as_deref().unwrap_or_default(),
                format!("no predictions for column '{column}'"),
            )
        })?;
        if predicted.len() != rows {
            return Err(TxError::backend(
                metadata.model_backend.as_deref().unwrap_or_default(),
                format!(
                    "column '{column}' has {} predictions for {rows} rows",
                    predicted.len()
                ),
            ));
        }

        let confidence_name = confidence_column(column);
        if output.data.contains_key(&confidence_name) {
            return Err(TxError::ConfidenceColumnCollision(confidence_name));
        }

        let mut confidence = Vec::with_capacity(rows);
        let mut evaluations = Vec::with_capacity(rows);
        for (features, value) in presence.iter().zip(&predicted) {
            let evaluation = validator.evaluate(features, value);
            confidence.push(serde_json::to_value(&evaluation)?);
            evaluations.push(evaluation);
        }

        if output.data.insert(column.clone(), predicted).is_none() {
            output.columns.push(column.clone());
        }
        output.data.insert(confidence_name.clone(), confidence);
        output.columns.push(confidence_name);
        output.evaluations.insert(column.clone(), evaluations);
    }

    Ok(output)
}

/// Every row must have one cell per column and column names must be unique,
/// otherwise per-column lists cannot stay aligned.
fn check_shape(input: &WorkingInput) -> TxResult<()> {
    let width = input.columns.len();
    if let Some((index, row)) = input
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(TxError::InvalidInput(format!(
            "row {index} has {} cells for {width} columns",
            row.len()
        )));
    }

    let mut seen = HashSet::with_capacity(width);
    if let Some(duplicate) = input.columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(TxError::InvalidInput(format!(
            "column '{duplicate}' appears more than once"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{RequestType, ValidatorBlob};
    use crate::validator::{JsonValidatorCodec, PresenceValidator};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn metadata(predict: &[&str]) -> ModelMetadata {
        let blob = PresenceValidator {
            feature_weights: vec![1.0, 1.0],
            full_accuracy: 1.0,
        }
        .encode()
        .unwrap();
        let mut record = ModelMetadata::new("m", RequestType::Predict);
        record.predict_columns = Some(predict.iter().map(|c| c.to_string()).collect());
        record.validators = Some(
            predict
                .iter()
                .map(|c| (c.to_string(), blob.clone()))
                .collect::<BTreeMap<String, ValidatorBlob>>(),
        );
        record
    }

    fn input() -> WorkingInput {
        WorkingInput::new(
            vec!["a".into(), "b".into(), "y".into()],
            vec![
                vec![json!(1), json!("p"), json!(null)],
                vec![json!(null), json!("q"), json!(null)],
            ],
        )
    }

    #[test]
    fn echoes_inputs_and_adds_confidence() {
        let mut predictions = Predictions::new();
        predictions.insert("y".into(), vec![json!(10), json!(20)]);

        let out = assemble(&JsonValidatorCodec, &metadata(&["y"]), &input(), predictions).unwrap();

        assert_eq!(out.columns, vec!["a", "b", "y", "y_confidence"]);
        assert_eq!(out.column("a").unwrap(), &[json!(1), json!(null)]);
        assert_eq!(out.column("y").unwrap(), &[json!(10), json!(20)]);

        let evals = out.evaluations_for("y").unwrap();
        assert_eq!(evals[0].confidence, 1.0);
        assert_eq!(evals[1].confidence, 0.5);
        assert_eq!(
            out.column("y_confidence").unwrap()[1],
            serde_json::to_value(&evals[1]).unwrap()
        );
    }

    #[test]
    fn confidence_collision_is_rejected() {
        let input = WorkingInput::new(
            vec!["y".into(), "y_confidence".into()],
            vec![vec![json!(null), json!(0.3)]],
        );
        let mut predictions = Predictions::new();
        predictions.insert("y".into(), vec![json!(1)]);

        let err = assemble(&JsonValidatorCodec, &metadata(&["y"]), &input, predictions).unwrap_err();
        assert!(matches!(err, TxError::ConfidenceColumnCollision(c) if c == "y_confidence"));
    }

    #[test]
    fn missing_validator_is_reported() {
        let mut record = metadata(&["y"]);
        record.validators = None;
        let mut predictions = Predictions::new();
        predictions.insert("y".into(), vec![json!(1), json!(2)]);

        let err = assemble(&JsonValidatorCodec, &record, &input(), predictions).unwrap_err();
        assert!(matches!(err, TxError::Validator { column, .. } if column == "y"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let input = WorkingInput::new(vec!["a".into(), "b".into()], vec![vec![json!(1)]]);
        let err = assemble(&JsonValidatorCodec, &metadata(&[]), &input, Predictions::new())
            .unwrap_err();
        assert!(matches!(err, TxError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let input = WorkingInput::new(vec!["a".into(), "a".into()], vec![]);
        let err = assemble(&JsonValidatorCodec, &metadata(&[]), &input, Predictions::new())
            .unwrap_err();
        assert!(matches!(err, TxError::InvalidInput(_)));
    }

    #[test]
    fn predicted_column_absent_from_input_is_appended() {
        let input = WorkingInput::new(vec!["a".into()], vec![vec![json!(1)]]);
        let mut predictions = Predictions::new();
        predictions.insert("z".into(), vec![json!("Z")]);

        let out = assemble(&JsonValidatorCodec, &metadata(&["z"]), &input, predictions).unwrap();
        assert_eq!(out.columns, vec!["a", "z", "z_confidence"]);
        assert_eq!(out.row_count(), 1);
    }
}
