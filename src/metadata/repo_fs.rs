//! Filesystem repositories for metadata and statistics records.
//!
//! One JSON document per model under `<data_root>/models` and
//! `<data_root>/stats`. Writes go through a temporary file and a rename so a
//! concurrent reader never observes a half-written record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::config::AppCfg;
use crate::common::error::{TxError, TxResult};

use super::domain::{validate_model_name, MetadataRepo, ModelMetadata, ModelStats, StatsRepo};

/// Directory of JSON documents keyed by model name.
struct JsonDir {
    root: PathBuf,
}

impl JsonDir {
    fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, model_name: &str) -> TxResult<PathBuf> {
        validate_model_name(model_name)?;
        Ok(self.root.join(format!("{model_name}.json")))
    }

    fn remove(&self, model_name: &str) -> TxResult<bool> {
        let path = self.path_for(model_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TxError::io("remove record", e)),
        }
    }

    fn read<T: DeserializeOwned>(&self, model_name: &str) -> TxResult<Option<T>> {
        let path = self.path_for(model_name)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TxError::io("read record", e)),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn write<T: Serialize>(&self, model_name: &str, record: &T) -> TxResult<()> {
        let path = self.path_for(model_name)?;
        fs::create_dir_all(&self.root).map_err(|e| TxError::io("create record dir", e))?;
        let body = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &body).map_err(|e| TxError::io("write record", e))
    }

    fn exists(&self, model_name: &str) -> TxResult<bool> {
        Ok(self.path_for(model_name)?.exists())
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Persist model metadata records on the local filesystem.
pub struct FsMetadataRepo {
    dir: JsonDir,
}

impl FsMetadataRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(PathBuf::from(&cfg.data_root).join("models"))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: JsonDir::new(root.into()),
        }
    }
}

impl MetadataRepo for FsMetadataRepo {
    fn delete(&self, model_name: &str) -> TxResult<()> {
        if self.dir.remove(model_name)? {
            tracing::debug!(model = model_name, "metadata record deleted");
        }
        Ok(())
    }

    fn find_one(&self, model_name: &str) -> TxResult<Option<ModelMetadata>> {
        self.dir.read(model_name)
    }

    fn insert(&self, record: &ModelMetadata) -> TxResult<()> {
        if self.dir.exists(&record.model_name)? {
            tracing::debug!(model = %record.model_name, "insert over existing metadata record");
        }
        self.dir.write(&record.model_name, record)
    }

    fn update(&self, record: &ModelMetadata) -> TxResult<()> {
        self.dir.write(&record.model_name, record)
    }
}

/// Persist per-model statistics on the local filesystem.
pub struct FsStatsRepo {
    dir: JsonDir,
}

impl FsStatsRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(PathBuf::from(&cfg.data_root).join("stats"))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: JsonDir::new(root.into()),
        }
    }
}

impl StatsRepo for FsStatsRepo {
    fn delete(&self, model_name: &str) -> TxResult<()> {
        self.dir.remove(model_name).map(|_| ())
    }

    fn get(&self, model_name: &str) -> TxResult<Option<ModelStats>> {
        self.dir.read(model_name)
    }

    fn put(&self, stats: &ModelStats) -> TxResult<()> {
        self.dir.write(&stats.model_name, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::domain::{ModelStatus, RequestType};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn insert_update_find_delete() {
        let dir = tempdir().unwrap();
        let repo = FsMetadataRepo::at(dir.path().join("models"));

        let mut record = ModelMetadata::new("churn", RequestType::Learn);
        record.current_phase = Some(ModelStatus::Trained);
        repo.insert(&record).unwrap();
        repo.insert(&record).unwrap();
        repo.update(&record).unwrap();

        assert_eq!(repo.find_one("churn").unwrap(), Some(record));

        repo.delete("churn").unwrap();
        assert_eq!(repo.find_one("churn").unwrap(), None);
    }

    #[test]
    fn deleting_absent_records_is_fine() {
        let dir = tempdir().unwrap();
        let repo = FsMetadataRepo::at(dir.path());
        repo.delete("ghost").unwrap();
        repo.delete("ghost").unwrap();

        let stats = FsStatsRepo::at(dir.path().join("stats"));
        stats.delete("ghost").unwrap();
    }

    #[test]
    fn traversal_names_are_rejected() {
        let dir = tempdir().unwrap();
        let repo = FsMetadataRepo::at(dir.path());
        let err = repo.find_one("../outside").unwrap_err();
        assert!(matches!(err, TxError::InvalidInput(_)));
    }

    #[test]
    fn stats_round_trip() {
        let dir = tempdir().unwrap();
        let repo = FsStatsRepo::at(dir.path());
        let mut stats = ModelStats {
            model_name: "churn".into(),
            ..ModelStats::default()
        };
        stats.columns.insert("age".into(), json!({"mean": 41.2}));

        repo.put(&stats).unwrap();
        assert_eq!(repo.get("churn").unwrap(), Some(stats));
    }

    #[test]
    fn corrupt_record_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), b"{not json").unwrap();
        let repo = FsMetadataRepo::at(dir.path());
        assert!(matches!(
            repo.find_one("bad").unwrap_err(),
            TxError::Serialization(_)
        ));
    }
}
