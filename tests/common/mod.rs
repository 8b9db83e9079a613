#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use modelctl::metadata::{MemoryMetadataRepo, MemoryStatsRepo, MetadataRepo, ModelStats};
use modelctl::transaction::SessionBuilder;
use modelctl::validator::PresenceValidator;
use modelctl::{
    AppCfg, Cell, Evaluation, ModelBackend, ModelMetadata, PhaseName, Predictions,
    ProbabilisticValidator, Session, TxContext, TxResult, ValidatorCodec, WorkingInput,
};

pub const BACKEND: &str = "stub";

/// Rows `[[1,'a'],[2,None]]` over columns `['x','y']`.
pub fn sample_input() -> WorkingInput {
    WorkingInput::new(
        vec!["x".into(), "y".into()],
        vec![vec![json!(1), json!("a")], vec![json!(2), json!(null)]],
    )
}

pub fn learn_request(name: &str) -> ModelMetadata {
    let mut request = ModelMetadata::new(name, modelctl::RequestType::Learn);
    request.predict_columns = Some(vec!["y".into()]);
    request.model_backend = Some(BACKEND.into());
    request.from_data = Some(json!({"query": "select x, y from t"}));
    request
}

pub fn predict_request(name: &str) -> ModelMetadata {
    ModelMetadata::new(name, modelctl::RequestType::Predict)
}

/// Counts every call made to the wrapped in-memory repository.
#[derive(Default)]
pub struct CountingRepo {
    pub inner: MemoryMetadataRepo,
    pub calls: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingRepo {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl MetadataRepo for CountingRepo {
    fn delete(&self, model_name: &str) -> TxResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(model_name)
    }

    fn find_one(&self, model_name: &str) -> TxResult<Option<ModelMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(model_name)
    }

    fn insert(&self, record: &ModelMetadata) -> TxResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record)
    }

    fn update(&self, record: &ModelMetadata) -> TxResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(record)
    }
}

/// Backend that returns canned predictions and counts calls.
#[derive(Clone, Default)]
pub struct StubBackend {
    pub predictions: Predictions,
    pub trains: Arc<AtomicUsize>,
    pub predicts: Arc<AtomicUsize>,
    pub fail_train: bool,
    pub panic_train: bool,
}

impl ModelBackend for StubBackend {
    fn train(&self, _: &Session, ctx: &mut TxContext) -> anyhow::Result<()> {
        self.trains.fetch_add(1, Ordering::SeqCst);
        if self.panic_train {
            panic!("backend crashed mid-fit");
        }
        if self.fail_train {
            anyhow::bail!("out of memory while fitting");
        }
        ctx.model_data.insert("weights", json!([0.5, 0.25]));
        Ok(())
    }

    fn predict(&self, _: &Session, _: &TxContext) -> anyhow::Result<Predictions> {
        self.predicts.fetch_add(1, Ordering::SeqCst);
        Ok(self.predictions.clone())
    }
}

/// One recorded validator call: feature-existence vector and predicted value.
pub type ValidatorCall = (Vec<bool>, Cell);

/// Codec whose validators record every evaluation and score by row order.
#[derive(Clone, Default)]
pub struct RecordingCodec {
    pub decodes: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<ValidatorCall>>>,
}

struct RecordingValidator {
    calls: Arc<Mutex<Vec<ValidatorCall>>>,
}

impl ProbabilisticValidator for RecordingValidator {
    fn evaluate(&self, features_present: &[bool], predicted: &Cell) -> Evaluation {
        let mut calls = self.calls.lock();
        calls.push((features_present.to_vec(), predicted.clone()));
        Evaluation {
            predicted_value: predicted.clone(),
            most_likely_value: predicted.clone(),
            confidence: calls.len() as f64 / 10.0,
        }
    }
}

impl ValidatorCodec for RecordingCodec {
    fn decode(
        &self,
        _: &modelctl::metadata::ValidatorBlob,
    ) -> anyhow::Result<Box<dyn ProbabilisticValidator>> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingValidator {
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Session with extractor, stats and analyzer phases over `input`.
pub fn session_builder(cfg: AppCfg, input: WorkingInput, repo: Arc<CountingRepo>) -> SessionBuilder {
    Session::builder(cfg)
        .metadata_repo(repo)
        .stats_repo(Arc::new(MemoryStatsRepo::new()))
        .phase(
            PhaseName::DataExtractor,
            move |_: &Session, ctx: &mut TxContext| -> anyhow::Result<()> {
                ctx.input = input.clone();
                Ok(())
            },
        )
        .phase(
            PhaseName::StatsGenerator,
            |session: &Session, ctx: &mut TxContext| -> anyhow::Result<()> {
                let mut stats = ModelStats {
                    model_name: ctx.metadata.model_name.clone(),
                    ..ModelStats::default()
                };
                for column in &ctx.input.columns {
                    stats.columns.insert(column.clone(), json!({"seen": true}));
                }
                session.stats_repo().put(&stats)?;
                ctx.model_data.insert("stats", json!(stats.columns));
                Ok(())
            },
        )
        .phase(
            PhaseName::ModelAnalyzer,
            |_: &Session, ctx: &mut TxContext| -> anyhow::Result<()> {
                let features = ctx
                    .input
                    .columns
                    .iter()
                    .filter(|c| !ctx.metadata.predict_columns().contains(*c))
                    .count();
                let blob = PresenceValidator {
                    feature_weights: vec![1.0; features],
                    full_accuracy: 0.9,
                }
                .encode()?;
                let validators: BTreeMap<_, _> = ctx
                    .metadata
                    .predict_columns()
                    .iter()
                    .map(|c| (c.clone(), blob.clone()))
                    .collect();
                ctx.metadata.validators = Some(validators);
                Ok(())
            },
        )
}

pub fn learn_request_for(name: &str, predict: &[&str]) -> ModelMetadata {
    let mut request = learn_request(name);
    request.predict_columns = Some(predict.iter().map(|c| c.to_string()).collect());
    request
}

pub fn predictions_for_sample() -> Predictions {
    let mut predictions = Predictions::new();
    predictions.insert("y".into(), vec![json!("A"), json!("B")]);
    predictions
}
