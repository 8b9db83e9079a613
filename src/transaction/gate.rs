//! Per-model mutual exclusion.
//!
//! The persisted metadata record is the only shared mutable resource, so every
//! transaction that reads or writes it runs under the lock for its model name.
//! Different models never contend.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Clone, Default)]
pub struct ModelGate {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ModelGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `model`.
    ///
    /// Not reentrant: calling back into the gate for the same model from `f`
    /// deadlocks.
    // TODO: detect same-thread reentry and fail with an error instead of blocking.
    pub fn with_model<T>(&self, model: &str, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.locks.entry(model.to_string()).or_default().value());
        let result = {
            let _held = match lock.try_lock() {
                Some(guard) => guard,
                None => {
                    tracing::debug!(model, "waiting for model gate");
                    lock.lock()
                }
            };
            f()
        };
        drop(lock);
        // Entries nobody else holds a handle to can go.
        self.locks
            .remove_if(model, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of models with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}
