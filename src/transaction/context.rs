use crate::data::{ModelData, WorkingInput};
use crate::metadata::ModelMetadata;

/// Working state of one transaction, handed to every phase and backend call.
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    pub metadata: ModelMetadata,
    pub input: WorkingInput,
    pub model_data: ModelData,
}

impl TxContext {
    pub fn new(metadata: ModelMetadata) -> Self {
        Self {
            metadata,
            input: WorkingInput::default(),
            model_data: ModelData::default(),
        }
    }
}
