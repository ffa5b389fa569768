//! In-process messaging substrate for the saga coordination protocol.
//!
//! A [`Node`] routes request/response messages to per-identity workers:
//! one tokio task per active `(kind, identity)` pair, lazily activated,
//! processing exactly one message at a time. It implements the
//! [`SagaTransport`] the orchestrator consumes and carries the recovery
//! sweep that re-triggers every saga left in the liveness set.
//!
//! [`SagaTransport`]: saga::SagaTransport

pub mod error;
pub mod node;
pub mod sweep;

pub use error::RequestError;
pub use node::Node;
pub use sweep::trigger_live_sagas;
