//! Inference domain: the PREDICT pipeline and its assembled output.

pub mod domain;
pub mod service;

pub use domain::{confidence_column, PredictOutcome, PredictOutput};
pub use service::execute_predict;
