use std::collections::BTreeMap;
use std::sync::Arc;

use common::{ActorKey, CallerLedger, Operation, OperationResponse, OperationType, ResourceState};
use state_store::{ResourceStore, StoreError};

use crate::behavior::ResourceBehavior;

pub const INVALID_SEQUENCE: &str = "Invalid sequence";
pub const NOT_PREPARED: &str = "This action was not prepared";
pub const UNKNOWN_ACTION: &str = "Unknown action";

/// One activated resource: typed domain state plus the per-caller
/// idempotency ledgers, persisted wholesale after every mutation.
pub struct Resource<B: ResourceBehavior> {
    key: ActorKey,
    inner: B,
    ledgers: BTreeMap<String, CallerLedger>,
    store: Arc<dyn ResourceStore>,
}

impl<B: ResourceBehavior> Resource<B> {
    /// Activates the resource at `key`, recovering persisted state or
    /// starting from the domain default.
    pub async fn activate(key: ActorKey, store: Arc<dyn ResourceStore>) -> Result<Self, StoreError> {
        let (inner, ledgers) = match store.get(&key.to_string()).await? {
            Some(state) => (
                serde_json::from_value(state.inner_state)?,
                state.caller_ledgers,
            ),
            None => (B::default(), BTreeMap::new()),
        };

        Ok(Self {
            key,
            inner,
            ledgers,
            store,
        })
    }

    pub fn key(&self) -> &ActorKey {
        &self.key
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// The idempotency ledger kept for one caller, if any.
    pub fn ledger(&self, caller_id: &str) -> Option<&CallerLedger> {
        self.ledgers.get(caller_id)
    }

    /// Handles one operation from a caller.
    ///
    /// Sequences more than one ahead of the ledger are rejected without
    /// touching any state; sequences at or below the ledger replay the
    /// cached response without re-invoking domain logic. Everything else is
    /// dispatched to the domain, recorded in the ledger, and persisted
    /// before replying.
    #[tracing::instrument(
        skip_all,
        fields(
            key = %self.key,
            caller = %operation.caller_id,
            sequence = operation.sequence,
            operation_type = %operation.operation_type,
        )
    )]
    pub async fn handle_operation(
        &mut self,
        operation: &Operation,
    ) -> Result<OperationResponse, StoreError> {
        metrics::counter!("resource_operations_total").increment(1);

        let ledger = self.ledgers.entry(operation.caller_id.clone()).or_default();

        if operation.sequence - ledger.sequence > 1 {
            tracing::debug!(ledger_sequence = ledger.sequence, "sequence gap rejected");
            return Ok(OperationResponse::error(INVALID_SEQUENCE));
        }

        if ledger.sequence >= operation.sequence {
            metrics::counter!("resource_replays_total").increment(1);
            tracing::debug!("replaying cached response");
            return Ok(ledger
                .responses
                .get(&operation.sequence)
                .cloned()
                .unwrap_or_else(|| OperationResponse::error(INVALID_SEQUENCE)));
        }

        let response = dispatch(
            &mut self.inner,
            ledger,
            operation.operation_type,
            &operation.action,
        );

        ledger.sequence += 1;
        ledger.responses.insert(operation.sequence, response.clone());

        self.persist().await?;

        Ok(response)
    }

    /// Removes a caller's entire ledger. Called by a completing saga to
    /// bound the ledger map; acknowledged whether or not an entry existed.
    #[tracing::instrument(skip_all, fields(key = %self.key, caller = caller_id))]
    pub async fn wipe_caller(&mut self, caller_id: &str) -> Result<(), StoreError> {
        if self.ledgers.remove(caller_id).is_some() {
            self.persist().await?;
            tracing::debug!("caller ledger wiped");
        }
        Ok(())
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let state = ResourceState {
            inner_state: serde_json::to_value(&self.inner)?,
            caller_ledgers: self.ledgers.clone(),
        };
        self.store.set(&self.key.to_string(), state).await
    }
}

/// Runs one operation against the domain handlers and maintains the
/// pending prepared-actions set.
///
/// Free function so the domain state and the caller's ledger can be
/// borrowed independently.
fn dispatch<B: ResourceBehavior>(
    inner: &mut B,
    ledger: &mut CallerLedger,
    operation_type: OperationType,
    action: &serde_json::Value,
) -> OperationResponse {
    let Ok(parsed) = serde_json::from_value::<B::Action>(action.clone()) else {
        return OperationResponse::error(UNKNOWN_ACTION);
    };

    match operation_type {
        OperationType::Prepare => {
            let response = inner.prepare(&parsed);
            if response.success {
                ledger.prepared_actions.push(action.clone());
            }
            response
        }
        OperationType::Confirm => match ledger.prepared_actions.iter().position(|a| a == action) {
            Some(index) => {
                let response = inner.confirm(&parsed);
                ledger.prepared_actions.remove(index);
                response
            }
            None => OperationResponse::error(NOT_PREPARED),
        },
        OperationType::Cancel => match ledger.prepared_actions.iter().position(|a| a == action) {
            Some(index) => {
                let response = inner.cancel(&parsed);
                ledger.prepared_actions.remove(index);
                response
            }
            None => OperationResponse::error(NOT_PREPARED),
        },
        OperationType::Execute => inner.execute(&parsed),
    }
}
