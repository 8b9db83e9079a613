//! In-process repositories, for embedding and tests.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::common::error::TxResult;

use super::domain::{MetadataRepo, ModelMetadata, ModelStats, StatsRepo};

#[derive(Default)]
pub struct MemoryMetadataRepo {
    records: RwLock<HashMap<String, ModelMetadata>>,
}

impl MemoryMetadataRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl MetadataRepo for MemoryMetadataRepo {
    fn delete(&self, model_name: &str) -> TxResult<()> {
        self.records.write().remove(model_name);
        Ok(())
    }

    fn find_one(&self, model_name: &str) -> TxResult<Option<ModelMetadata>> {
        Ok(self.records.read().get(model_name).cloned())
    }

    fn insert(&self, record: &ModelMetadata) -> TxResult<()> {
        self.records
            .write()
            .insert(record.model_name.clone(), record.clone());
        Ok(())
    }

    fn update(&self, record: &ModelMetadata) -> TxResult<()> {
        self.insert(record)
    }
}

#[derive(Default)]
pub struct MemoryStatsRepo {
    records: RwLock<HashMap<String, ModelStats>>,
}

impl MemoryStatsRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsRepo for MemoryStatsRepo {
    fn delete(&self, model_name: &str) -> TxResult<()> {
        self.records.write().remove(model_name);
        Ok(())
    }

    fn get(&self, model_name: &str) -> TxResult<Option<ModelStats>> {
        Ok(self.records.read().get(model_name).cloned())
    }

    fn put(&self, stats: &ModelStats) -> TxResult<()> {
        self.records
            .write()
            .insert(stats.model_name.clone(), stats.clone());
        Ok(())
    }
}
