//! Shared data model for the saga coordination protocol.
//!
//! Everything that crosses a crate boundary lives here: actor addressing,
//! the operation/response wire types, the persisted resource and saga
//! state, and the boundary message enums.

pub mod key;
pub mod message;
pub mod operation;
pub mod state;

pub use key::{ActorKey, KeyParseError};
pub use message::{Envelope, Request, Response};
pub use operation::{Operation, OperationResponse, OperationType};
pub use state::{CallerLedger, ResourceState, SagaResult, SagaState};
