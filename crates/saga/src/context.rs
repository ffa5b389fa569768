use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use common::{ActorKey, Operation, OperationResponse, OperationType};
use serde::Serialize;

use crate::error::SagaError;
use crate::transport::SagaTransport;

/// Handle a saga body uses to call resources.
///
/// Every call records the target in the participant set (so a completing
/// saga knows whose ledgers to wipe) and stamps the next sequence number
/// for that resource. Counters live only in working memory and start at
/// zero on every (re-)run: a resumed body replays the original
/// conversation against the resource's response cache and goes live
/// exactly where the previous run stopped.
pub struct SagaContext {
    caller_id: String,
    transport: Arc<dyn SagaTransport>,
    sequences: HashMap<String, i64>,
    participants: BTreeSet<String>,
}

impl SagaContext {
    pub fn new(caller_id: String, transport: Arc<dyn SagaTransport>) -> Self {
        Self {
            caller_id,
            transport,
            sequences: HashMap::new(),
            participants: BTreeSet::new(),
        }
    }

    /// The saga's own `"{kind}/{id}"` key, used as the idempotency
    /// partition key on every resource it talks to.
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Asks a resource to reserve `action` for a later confirm or cancel.
    pub async fn prepare<A: Serialize>(
        &mut self,
        kind: &str,
        id: &str,
        action: &A,
    ) -> Result<OperationResponse, SagaError> {
        self.request(kind, id, OperationType::Prepare, action).await
    }

    /// Applies a previously prepared action.
    pub async fn confirm<A: Serialize>(
        &mut self,
        kind: &str,
        id: &str,
        action: &A,
    ) -> Result<OperationResponse, SagaError> {
        self.request(kind, id, OperationType::Confirm, action).await
    }

    /// Rolls back a previously prepared action.
    pub async fn cancel<A: Serialize>(
        &mut self,
        kind: &str,
        id: &str,
        action: &A,
    ) -> Result<OperationResponse, SagaError> {
        self.request(kind, id, OperationType::Cancel, action).await
    }

    /// Applies a single-step, non-compensable action.
    pub async fn execute<A: Serialize>(
        &mut self,
        kind: &str,
        id: &str,
        action: &A,
    ) -> Result<OperationResponse, SagaError> {
        self.request(kind, id, OperationType::Execute, action).await
    }

    /// Every resource this context has addressed, as `"{kind}/{id}"` keys.
    pub(crate) fn into_participants(self) -> BTreeSet<String> {
        self.participants
    }

    async fn request<A: Serialize>(
        &mut self,
        kind: &str,
        id: &str,
        operation_type: OperationType,
        action: &A,
    ) -> Result<OperationResponse, SagaError> {
        let target = ActorKey::new(kind, id);
        let participant = target.to_string();
        self.participants.insert(participant.clone());

        let sequence = self.sequences.get(&participant).copied().unwrap_or(0) + 1;
        let operation = Operation {
            caller_id: self.caller_id.clone(),
            sequence,
            operation_type,
            action: serde_json::to_value(action)?,
        };

        tracing::debug!(
            caller = %self.caller_id,
            target = %participant,
            sequence,
            %operation_type,
            "requesting operation"
        );
        let response = self.transport.operation(&target, operation).await?;

        // Only a delivered exchange advances the counter; a failed
        // response still occupies its sequence slot on the resource.
        *self.sequences.entry(participant).or_insert(0) += 1;

        Ok(response)
    }
}
