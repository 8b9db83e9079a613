//! Worker pool running background learn transactions.
//!
//! Every submission hands back a [`JobHandle`]. Callers may join it, poll it,
//! or drop it to detach; the job runs to completion either way.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::common::error::{TxError, TxResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct LearnPool {
    tx: Sender<Job>,
    size: usize,
}

impl LearnPool {
    pub fn new(size: usize) -> TxResult<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();

        for index in 0..size {
            let rx = rx.clone();
            thread::Builder::new()
                .name(format!("learn-worker-{index}"))
                .spawn(move || {
                    // Ends once every sender is gone.
                    for job in rx.iter() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!(worker = index, "learn job panicked");
                        }
                    }
                })
                .map_err(|e| TxError::Config(format!("could not start learn worker: {e}")))?;
        }

        Ok(Self { tx, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn submit<T, F>(&self, job: F) -> TxResult<JobHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let wrapped: Job = Box::new(move || {
            // A dropped handle just means nobody is listening.
            let _ = done_tx.send(job());
        });
        self.tx.send(wrapped).map_err(|_| TxError::WorkerGone)?;
        Ok(JobHandle { rx: done_rx })
    }
}

/// Handle to a job running on a [`LearnPool`].
pub struct JobHandle<T> {
    rx: Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Block until the job finishes.
    pub fn join(self) -> TxResult<T> {
        self.rx.recv().map_err(|_| TxError::WorkerGone)
    }

    /// Non-blocking check; `None` while the job is still running.
    pub fn try_join(&self) -> Option<TxResult<T>> {
        match self.rx.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TxError::WorkerGone)),
        }
    }
}

impl<R> JobHandle<TxResult<R>> {
    /// Join and flatten the job's own result.
    pub fn wait(self) -> TxResult<R> {
        self.join()?
    }
}
