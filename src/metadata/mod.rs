//! Metadata domain: the persisted model descriptor and its repositories.

pub mod domain;
pub mod repo_fs;
pub mod repo_mem;

pub use domain::{
    MetadataRepo, ModelMetadata, ModelStats, ModelStatus, RequestType, StatsRepo, ValidatorBlob,
};
pub use repo_fs::{FsMetadataRepo, FsStatsRepo};
pub use repo_mem::{MemoryMetadataRepo, MemoryStatsRepo};
