//! The Resource role of the saga coordination protocol.
//!
//! A resource guards one unit of domain state behind the
//! Prepare/Confirm/Cancel/Execute protocol, keeping a per-caller
//! idempotency ledger so that retried operations replay their original
//! response instead of re-executing domain logic.

pub mod behavior;
pub mod resource;
pub mod worker;

pub use behavior::ResourceBehavior;
pub use resource::{INVALID_SEQUENCE, NOT_PREPARED, Resource, UNKNOWN_ACTION};
pub use worker::spawn;
