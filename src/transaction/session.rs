//! Session: the shared handle every transaction runs against.
//!
//! Bundles configuration, the phase and backend registries, the repositories,
//! the per-model gate and (when learns run in the background) the learn
//! worker pool. Cloning is cheap.

use std::sync::Arc;

use crate::backend::{BackendRegistry, ModelBackend};
use crate::common::config::AppCfg;
use crate::common::error::TxResult;
use crate::common::log;
use crate::data::WorkingInput;
use crate::metadata::{FsMetadataRepo, FsStatsRepo, MetadataRepo, StatsRepo};
use crate::phases::{Phase, PhaseName, PhaseRegistry};
use crate::validator::{JsonValidatorCodec, ValidatorCodec};

use super::context::TxContext;
use super::gate::ModelGate;
use super::workers::LearnPool;

/// Executes NORMAL_SELECT requests on behalf of the query layer.
pub trait SelectExecutor: Send + Sync {
    fn execute(&self, session: &Session, ctx: &mut TxContext) -> anyhow::Result<WorkingInput>;
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    cfg: AppCfg,
    phases: PhaseRegistry,
    backends: BackendRegistry,
    codec: Arc<dyn ValidatorCodec>,
    metadata: Arc<dyn MetadataRepo>,
    stats: Arc<dyn StatsRepo>,
    select: Option<Arc<dyn SelectExecutor>>,
    gate: ModelGate,
    pool: Option<LearnPool>,
}

impl Session {
    pub fn builder(cfg: AppCfg) -> SessionBuilder {
        SessionBuilder::new(cfg)
    }

    pub fn cfg(&self) -> &AppCfg {
        &self.inner.cfg
    }

    pub fn phases(&self) -> &PhaseRegistry {
        &self.inner.phases
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.inner.backends
    }

    pub fn validator_codec(&self) -> &dyn ValidatorCodec {
        self.inner.codec.as_ref()
    }

    pub fn metadata_repo(&self) -> &dyn MetadataRepo {
        self.inner.metadata.as_ref()
    }

    pub fn stats_repo(&self) -> &dyn StatsRepo {
        self.inner.stats.as_ref()
    }

    pub fn select_executor(&self) -> Option<&dyn SelectExecutor> {
        self.inner.select.as_deref()
    }

    pub fn gate(&self) -> &ModelGate {
        &self.inner.gate
    }

    /// Present only when learns run in the background.
    pub fn learn_pool(&self) -> Option<&LearnPool> {
        self.inner.pool.as_ref()
    }
}

pub struct SessionBuilder {
    cfg: AppCfg,
    phases: PhaseRegistry,
    backends: BackendRegistry,
    codec: Option<Arc<dyn ValidatorCodec>>,
    metadata: Option<Arc<dyn MetadataRepo>>,
    stats: Option<Arc<dyn StatsRepo>>,
    select: Option<Arc<dyn SelectExecutor>>,
}

impl SessionBuilder {
    pub fn new(cfg: AppCfg) -> Self {
        Self {
            cfg,
            phases: PhaseRegistry::new(),
            backends: BackendRegistry::new(),
            codec: None,
            metadata: None,
            stats: None,
            select: None,
        }
    }

    pub fn phase(mut self, name: PhaseName, phase: impl Phase + 'static) -> Self {
        self.phases.register(name, Arc::new(phase));
        self
    }

    pub fn backend(mut self, id: impl Into<String>, backend: impl ModelBackend + 'static) -> Self {
        self.backends.register(id, Arc::new(backend));
        self
    }

    pub fn validator_codec(mut self, codec: impl ValidatorCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn metadata_repo(mut self, repo: Arc<dyn MetadataRepo>) -> Self {
        self.metadata = Some(repo);
        self
    }

    pub fn stats_repo(mut self, repo: Arc<dyn StatsRepo>) -> Self {
        self.stats = Some(repo);
        self
    }

    pub fn select_executor(mut self, executor: impl SelectExecutor + 'static) -> Self {
        self.select = Some(Arc::new(executor));
        self
    }

    /// Finish the session, installing logging on first use. Repositories default to the filesystem ones under
    /// `cfg.data_root`; the codec defaults to [`JsonValidatorCodec`].
    pub fn build(self) -> TxResult<Session> {
        self.cfg.validate()?;
        log::init(&self.cfg);

        let missing = self.phases.missing();
        if !missing.is_empty() {
            tracing::warn!(?missing, "session built without every phase module");
        }

        let pool = if self.cfg.learn_in_background {
            Some(LearnPool::new(self.cfg.learn_workers)?)
        } else {
            None
        };

        let metadata: Arc<dyn MetadataRepo> = match self.metadata {
            Some(repo) => repo,
            None => Arc::new(FsMetadataRepo::new(&self.cfg)),
        };
        let stats: Arc<dyn StatsRepo> = match self.stats {
            Some(repo) => repo,
            None => Arc::new(FsStatsRepo::new(&self.cfg)),
        };

        tracing::info!(
            backends = ?self.backends.ids(),
            background_learn = self.cfg.learn_in_background,
            "session ready"
        );

        let codec: Arc<dyn ValidatorCodec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(JsonValidatorCodec),
        };

        Ok(Session {
            inner: Arc::new(SessionInner {
                codec,
                cfg: self.cfg,
                phases: self.phases,
                backends: self.backends,
                metadata,
                stats,
                select: self.select,
                gate: ModelGate::new(),
                pool,
            }),
        })
    }
}
