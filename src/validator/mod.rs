//! Probabilistic validators: per-column confidence scoring of predictions.
//!
//! A validator is persisted as an opaque [`ValidatorBlob`] on the metadata
//! record and decoded through the session's [`ValidatorCodec`] once per
//! predict-column per transaction.

use serde::{Deserialize, Serialize};

use crate::data::Cell;
use crate::metadata::ValidatorBlob;

/// Confidence evaluation for one predicted cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub predicted_value: Cell,
    pub most_likely_value: Cell,
    pub confidence: f64,
}

pub trait ProbabilisticValidator: Send {
    /// Score `predicted` given which input features were present.
    fn evaluate(&self, features_present: &[bool], predicted: &Cell) -> Evaluation;
}

/// Turns persisted validator blobs back into validators.
pub trait ValidatorCodec: Send + Sync {
    fn decode(&self, blob: &ValidatorBlob) -> anyhow::Result<Box<dyn ProbabilisticValidator>>;
}

/// Validator whose confidence is the weighted share of present features,
/// scaled by the accuracy observed when every feature was present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresenceValidator {
    /// One weight per input feature, in extraction order.
    pub feature_weights: Vec<f64>,
    /// Accuracy with all features present, in `[0, 1]`.
    pub full_accuracy: f64,
}

impl PresenceValidator {
    pub fn encode(&self) -> serde_json::Result<ValidatorBlob> {
        serde_json::to_vec(self).map(ValidatorBlob)
    }
}

impl ProbabilisticValidator for PresenceValidator {
    fn evaluate(&self, features_present: &[bool], predicted: &Cell) -> Evaluation {
        let total: f64 = self.feature_weights.iter().sum();
        let present: f64 = self
            .feature_weights
            .iter()
            .zip(features_present)
            .filter(|(_, present)| **present)
            .map(|(weight, _)| weight)
            .sum();
        let coverage = if total > 0.0 { present / total } else { 1.0 };

        Evaluation {
            predicted_value: predicted.clone(),
            most_likely_value: predicted.clone(),
            confidence: (self.full_accuracy * coverage).clamp(0.0, 1.0),
        }
    }
}

/// Decodes blobs holding a JSON-encoded [`PresenceValidator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonValidatorCodec;

impl ValidatorCodec for JsonValidatorCodec {
    fn decode(&self, blob: &ValidatorBlob) -> anyhow::Result<Box<dyn ProbabilisticValidator>> {
        let validator: PresenceValidator = serde_json::from_slice(blob.as_bytes())?;
        Ok(Box::new(validator))
    }
}
