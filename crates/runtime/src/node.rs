use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ActorKey, Envelope, Operation, OperationResponse, Request, Response, SagaState};
use resource::ResourceBehavior;
use saga::{SagaBehavior, SagaError, SagaTransport};
use serde::Serialize;
use state_store::{LivenessStore, ResourceStore, SagaStore};
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::error::RequestError;

/// Creates the worker serving one identity of a registered kind.
type Spawner = Arc<dyn Fn(&Node, ActorKey) -> mpsc::UnboundedSender<Envelope> + Send + Sync>;

/// In-process messaging substrate: routes each request to the worker
/// owning the target `(kind, identity)` pair.
///
/// Kinds are registered once at startup; identities activate lazily on
/// first message. Every identity gets exactly one worker consuming one
/// queue, so messages to it are processed strictly one at a time while
/// different identities run fully in parallel. Delivery is at-least-once
/// from the sender's perspective, which the resource protocol is built to
/// absorb.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    kinds: RwLock<HashMap<String, Spawner>>,
    workers: Mutex<HashMap<String, mpsc::UnboundedSender<Envelope>>>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NodeInner {
                kinds: RwLock::new(HashMap::new()),
                workers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a resource kind backed by `store`.
    pub async fn register_resource<B: ResourceBehavior + Sync>(&self, store: Arc<dyn ResourceStore>) {
        let spawner: Spawner = Arc::new(move |_, key| resource::spawn::<B>(key, store.clone()));
        self.register(B::kind(), spawner).await;
    }

    /// Registers a saga kind driven by `behavior`, persisting through
    /// `store` and marking in-flight instances in `liveness`.
    pub async fn register_saga<B: SagaBehavior>(
        &self,
        behavior: B,
        store: Arc<dyn SagaStore>,
        liveness: Arc<dyn LivenessStore>,
    ) {
        let behavior = Arc::new(behavior);
        let spawner: Spawner = Arc::new(move |node, key| {
            saga::spawn(
                behavior.clone(),
                key,
                store.clone(),
                liveness.clone(),
                Arc::new(node.clone()),
            )
        });
        self.register(B::kind(), spawner).await;
    }

    async fn register(&self, kind: &str, spawner: Spawner) {
        tracing::debug!(kind, "registering actor kind");
        self.inner
            .kinds
            .write()
            .await
            .insert(kind.to_string(), spawner);
    }

    /// Delivers a request to the target identity and awaits its reply.
    ///
    /// A send to a worker whose channel has closed (its activation
    /// failed) re-activates the identity and retries once; a worker that
    /// accepts the request but drops the reply surfaces as
    /// [`RequestError::NoReply`].
    pub async fn request(
        &self,
        target: &ActorKey,
        request: Request,
    ) -> Result<Response, RequestError> {
        let sender = self.worker(target).await?;
        let (envelope, reply) = Envelope::new(request.clone());

        let reply = match sender.send(envelope) {
            Ok(()) => reply,
            Err(_) => {
                tracing::debug!(%target, "worker retired, re-activating");
                let sender = self.reactivate(target).await?;
                let (envelope, reply) = Envelope::new(request);
                sender.send(envelope).map_err(|_| RequestError::NoReply)?;
                reply
            }
        };

        reply.await.map_err(|_| RequestError::NoReply)
    }

    /// Sends an operation to a resource.
    pub async fn operation(
        &self,
        target: &ActorKey,
        operation: Operation,
    ) -> Result<OperationResponse, RequestError> {
        match self.request(target, Request::Operation(operation)).await? {
            Response::Operation(response) => Ok(response),
            _ => Err(RequestError::UnexpectedResponse("Operation")),
        }
    }

    /// Asks a resource to drop its ledger for `caller_id`.
    pub async fn wipe_participant(
        &self,
        target: &ActorKey,
        caller_id: &str,
    ) -> Result<(), RequestError> {
        let request = Request::WipeParticipant {
            caller_id: caller_id.to_string(),
        };
        match self.request(target, request).await? {
            Response::Ack => Ok(()),
            _ => Err(RequestError::UnexpectedResponse("WipeParticipant")),
        }
    }

    /// Delivers a saga's input, starting it or poking an existing one.
    pub async fn start_saga<I: Serialize>(
        &self,
        target: &ActorKey,
        input: &I,
    ) -> Result<(), RequestError> {
        let request = Request::Input(serde_json::to_value(input)?);
        match self.request(target, request).await? {
            Response::Ack => Ok(()),
            _ => Err(RequestError::UnexpectedResponse("Input")),
        }
    }

    /// Delivers a recovery trigger to a saga identity.
    pub async fn trigger(&self, target: &ActorKey) -> Result<(), RequestError> {
        match self.request(target, Request::Trigger).await? {
            Response::Ack => Ok(()),
            _ => Err(RequestError::UnexpectedResponse("Trigger")),
        }
    }

    /// Reads a saga's persisted state; `None` means uninitialized.
    pub async fn current_state(
        &self,
        target: &ActorKey,
    ) -> Result<Option<SagaState>, RequestError> {
        match self.request(target, Request::GetCurrentState).await? {
            Response::State(state) => Ok(state),
            _ => Err(RequestError::UnexpectedResponse("GetCurrentState")),
        }
    }

    /// Awaits a saga's completed state; answered immediately when the
    /// saga is already completed or never initialized (`None`).
    pub async fn state_when_completed(
        &self,
        target: &ActorKey,
    ) -> Result<Option<SagaState>, RequestError> {
        match self.request(target, Request::GetStateWhenCompleted).await? {
            Response::State(state) => Ok(state),
            _ => Err(RequestError::UnexpectedResponse("GetStateWhenCompleted")),
        }
    }

    async fn worker(
        &self,
        target: &ActorKey,
    ) -> Result<mpsc::UnboundedSender<Envelope>, RequestError> {
        if let Some(sender) = self.inner.workers.lock().await.get(&target.to_string()) {
            return Ok(sender.clone());
        }
        self.activate(target).await
    }

    async fn activate(
        &self,
        target: &ActorKey,
    ) -> Result<mpsc::UnboundedSender<Envelope>, RequestError> {
        let spawner = self
            .inner
            .kinds
            .read()
            .await
            .get(target.kind())
            .cloned()
            .ok_or_else(|| RequestError::UnknownKind(target.kind().to_string()))?;

        let mut workers = self.inner.workers.lock().await;
        let sender = workers
            .entry(target.to_string())
            .or_insert_with(|| {
                tracing::debug!(%target, "activating identity");
                spawner(self, target.clone())
            })
            .clone();
        Ok(sender)
    }

    async fn reactivate(
        &self,
        target: &ActorKey,
    ) -> Result<mpsc::UnboundedSender<Envelope>, RequestError> {
        self.inner.workers.lock().await.remove(&target.to_string());
        self.activate(target).await
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SagaTransport for Node {
    async fn operation(
        &self,
        target: &ActorKey,
        operation: Operation,
    ) -> Result<OperationResponse, SagaError> {
        Node::operation(self, target, operation)
            .await
            .map_err(|error| SagaError::Transport(error.to_string()))
    }

    async fn wipe_participant(&self, target: &ActorKey, caller_id: &str) -> Result<(), SagaError> {
        Node::wipe_participant(self, target, caller_id)
            .await
            .map_err(|error| SagaError::Transport(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OperationType;
    use serde::{Deserialize, Serialize};
    use state_store::InMemoryResourceStore;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    enum CounterAction {
        Increment,
    }

    impl ResourceBehavior for Counter {
        type Action = CounterAction;

        fn kind() -> &'static str {
            "Counter"
        }

        fn prepare(&mut self, _action: &Self::Action) -> OperationResponse {
            OperationResponse::ok()
        }

        fn confirm(&mut self, _action: &Self::Action) -> OperationResponse {
            self.count += 1;
            OperationResponse::ok()
        }

        fn cancel(&mut self, _action: &Self::Action) -> OperationResponse {
            OperationResponse::ok()
        }

        fn execute(&mut self, _action: &Self::Action) -> OperationResponse {
            self.count += 1;
            OperationResponse::ok()
        }
    }

    fn increment(caller_id: &str, sequence: i64) -> Operation {
        Operation {
            caller_id: caller_id.to_string(),
            sequence,
            operation_type: OperationType::Execute,
            action: serde_json::to_value(CounterAction::Increment).unwrap(),
        }
    }

    #[tokio::test]
    async fn routes_operations_to_the_owning_identity() {
        let node = Node::new();
        let store = Arc::new(InMemoryResourceStore::new());
        node.register_resource::<Counter>(store.clone()).await;

        let target = ActorKey::new("Counter", "c-1");
        let response = node.operation(&target, increment("caller", 1)).await.unwrap();
        assert!(response.success);

        // Identities are independent: c-2 starts its own ledger.
        let other = ActorKey::new("Counter", "c-2");
        let response = node.operation(&other, increment("caller", 1)).await.unwrap();
        assert!(response.success);

        let state = store.get("Counter/c-1").await.unwrap().unwrap();
        let counter: Counter = serde_json::from_value(state.inner_state).unwrap();
        assert_eq!(counter.count, 1);
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let node = Node::new();
        let target = ActorKey::new("Nowhere", "n-1");

        let result = node.operation(&target, increment("caller", 1)).await;
        assert!(matches!(result, Err(RequestError::UnknownKind(kind)) if kind == "Nowhere"));
    }

    #[tokio::test]
    async fn wipe_participant_acknowledges_for_unknown_callers() {
        let node = Node::new();
        node.register_resource::<Counter>(Arc::new(InMemoryResourceStore::new()))
            .await;

        let target = ActorKey::new("Counter", "c-1");
        node.wipe_participant(&target, "Saga/never").await.unwrap();
    }
}
