//! Phase registry: a fixed table from [`PhaseName`] to the unit that runs it.
//!
//! Phases are supplied by the embedding application. A phase mutates the
//! transaction context (working input, model data, metadata record) and
//! returns nothing else.

use std::fmt;
use std::sync::Arc;

use crate::common::error::{TxError, TxResult};
use crate::transaction::{Session, TxContext};

/// Every phase a transaction may run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PhaseName {
    DataExtractor,
    StatsGenerator,
    ModelAnalyzer,
}

impl PhaseName {
    pub const ALL: [PhaseName; 3] = [
        PhaseName::DataExtractor,
        PhaseName::StatsGenerator,
        PhaseName::ModelAnalyzer,
    ];

    const fn slot(self) -> usize {
        match self {
            PhaseName::DataExtractor => 0,
            PhaseName::StatsGenerator => 1,
            PhaseName::ModelAnalyzer => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::DataExtractor => "DataExtractor",
            PhaseName::StatsGenerator => "StatsGenerator",
            PhaseName::ModelAnalyzer => "ModelAnalyzer",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executable step of a transaction.
pub trait Phase: Send + Sync {
    fn run(&self, session: &Session, ctx: &mut TxContext) -> anyhow::Result<()>;
}

impl<F> Phase for F
where
    F: Fn(&Session, &mut TxContext) -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self, session: &Session, ctx: &mut TxContext) -> anyhow::Result<()> {
        self(session, ctx)
    }
}

#[derive(Clone, Default)]
pub struct PhaseRegistry {
    table: [Option<Arc<dyn Phase>>; 3],
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: PhaseName, phase: Arc<dyn Phase>) {
        self.table[name.slot()] = Some(phase);
    }

    pub fn with(mut self, name: PhaseName, phase: impl Phase + 'static) -> Self {
        self.register(name, Arc::new(phase));
        self
    }

    pub fn resolve(&self, name: PhaseName) -> TxResult<Arc<dyn Phase>> {
        self.table[name.slot()]
            .clone()
            .ok_or_else(|| TxError::PhaseLoad {
                phase: name,
                reason: "no module registered".to_string(),
            })
    }

    /// Phases with no registered module.
    pub fn missing(&self) -> Vec<PhaseName> {
        PhaseName::ALL
            .into_iter()
            .filter(|name| self.table[name.slot()].is_none())
            .collect()
    }
}

/// Resolve and run one phase against the context. Any failure is logged and
/// surfaced as [`TxError::PhaseLoad`].
pub fn call_phase(session: &Session, ctx: &mut TxContext, name: PhaseName) -> TxResult<()> {
    let phase = session.phases().resolve(name).inspect_err(|error| {
        tracing::error!(phase = %name, %error, "could not load phase module");
    })?;

    tracing::debug!(phase = %name, model = %ctx.metadata.model_name, "phase start");
    phase.run(session, ctx).map_err(|err| {
        let error = TxError::phase(name, err);
        tracing::error!(phase = %name, %error, "phase failed");
        error
    })?;
    tracing::debug!(phase = %name, model = %ctx.metadata.model_name, "phase done");
    Ok(())
}
