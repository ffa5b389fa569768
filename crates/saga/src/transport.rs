use async_trait::async_trait;
use common::{ActorKey, Operation, OperationResponse};

use crate::error::SagaError;

/// The messaging contract the orchestrator consumes: addressed
/// request/response delivery to the actor instance owning a
/// `(kind, identity)` pair.
///
/// Delivery is at-least-once from the sender's perspective; the receiving
/// side is expected to process one message at a time per identity. The
/// resource protocol is built to absorb the resulting duplicates, so
/// implementations may retry freely.
#[async_trait]
pub trait SagaTransport: Send + Sync {
    /// Delivers an operation to a resource and returns its response.
    async fn operation(
        &self,
        target: &ActorKey,
        operation: Operation,
    ) -> Result<OperationResponse, SagaError>;

    /// Asks a resource to drop its ledger for `caller_id`.
    async fn wipe_participant(&self, target: &ActorKey, caller_id: &str) -> Result<(), SagaError>;
}
