// lib.rs - transaction controller for predictive models
pub mod backend;
pub mod common;
pub mod data;
pub mod inference;
pub mod metadata;
pub mod phases;
pub mod training;
pub mod transaction;
pub mod validator;

pub use backend::{BackendRegistry, ModelBackend, Predictions};
pub use common::{AppCfg, ErrorCode, TxError, TxResult};
pub use data::{Cell, ModelData, WorkingInput};
pub use inference::{PredictOutcome, PredictOutput};
pub use metadata::{ModelMetadata, ModelStatus, RequestType};
pub use phases::{Phase, PhaseName, PhaseRegistry};
pub use training::{LearnOutcome, LearnReport, TrainOutput};
pub use transaction::{Session, Transaction, TransactionOutput, TxContext};
pub use validator::{Evaluation, ProbabilisticValidator, ValidatorCodec};
