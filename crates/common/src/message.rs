use tokio::sync::oneshot;

use crate::operation::{Operation, OperationResponse};
use crate::state::SagaState;

/// Every message deliverable to an actor identity.
///
/// `Operation` and `WipeParticipant` address resources; the rest address
/// sagas. Delivery is at-least-once from the sender's perspective, so every
/// handler must tolerate duplicates.
#[derive(Debug, Clone)]
pub enum Request {
    Operation(Operation),
    WipeParticipant { caller_id: String },
    /// Saga input: starts a new saga or is ignored by a busy one.
    Input(serde_json::Value),
    /// Recovery signal: resume an incomplete saga or self-terminate.
    Trigger,
    GetCurrentState,
    GetStateWhenCompleted,
}

/// Reply to a [`Request`]. `State(None)` is the uninitialized sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Operation(OperationResponse),
    Ack,
    State(Option<SagaState>),
}

/// A request paired with its reply channel, as queued on an actor's
/// command queue. Replies may be deferred (completion waiters); a dropped
/// sender means the caller stopped listening and is ignored.
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

impl Envelope {
    pub fn new(request: Request) -> (Self, oneshot::Receiver<Response>) {
        let (reply, rx) = oneshot::channel();
        (Self { request, reply }, rx)
    }
}
