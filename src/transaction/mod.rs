//! Transaction domain: the top-level request state machine and the shared
//! session it runs against.

pub mod context;
pub mod gate;
pub mod service;
pub mod session;
pub mod workers;

pub use context::TxContext;
pub use gate::ModelGate;
pub use service::{LearnHandle, Transaction, TransactionOutput};
pub use session::{SelectExecutor, Session, SessionBuilder};
pub use workers::{JobHandle, LearnPool};
