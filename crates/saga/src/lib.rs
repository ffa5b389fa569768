//! The Orchestrator role of the saga coordination protocol.
//!
//! An orchestrator drives one saga instance to completion exactly once:
//! it persists the input, runs a domain body that calls resources through
//! a [`SagaContext`], records the verdict, answers completion waiters,
//! wipes its ledger on every participant, and deletes its own state.
//! Crash recovery is a whole-body re-run from the persisted input,
//! triggered by an external sweep and made safe by resource-side
//! idempotency rather than by remembering where the body left off.

pub mod behavior;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod transport;

pub use behavior::{SagaBehavior, SagaOutcome};
pub use context::SagaContext;
pub use error::{Result, SagaError};
pub use orchestrator::spawn;
pub use transport::SagaTransport;
