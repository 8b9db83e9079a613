//! Training domain: the LEARN pipeline and its outcomes.

pub mod domain;
pub mod service;

pub use domain::{LearnOutcome, LearnReport, TrainOutput, NO_RESULTS, STATUS_COLUMN};
pub use service::execute_learn;
