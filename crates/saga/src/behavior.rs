use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::SagaContext;
use crate::error::SagaError;

/// Domain verdict of a saga body.
///
/// Both variants complete the saga; a failed saga is still a finished one,
/// visible to callers as `{completed: true, succeeded: false}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaOutcome {
    pub succeeded: bool,
    pub error_messages: Vec<String>,
}

impl SagaOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            error_messages: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error_messages: vec![message.into()],
        }
    }
}

/// Domain extension point for a saga kind.
///
/// `run` is the saga body: it receives the persisted input and drives one
/// or more resources through the context's prepare/confirm/cancel/execute
/// helpers. Recovery re-runs the body from the same input after a crash,
/// so bodies must tolerate partial progress; resource-side response
/// replay makes the re-run observe the original conversation before it
/// goes live where the crash interrupted it.
///
/// Domain failures are returned as [`SagaOutcome::failure`]. A
/// [`SagaError`] is an infrastructure failure: the saga stays incomplete
/// and a later trigger runs the body again.
#[async_trait]
pub trait SagaBehavior: Send + Sync + 'static {
    /// Input persisted at initialization and handed to every (re-)run.
    type Input: Serialize + DeserializeOwned + Send;

    /// Stable logical type name, the `kind` half of the saga's key.
    fn kind() -> &'static str;

    async fn run(
        &self,
        ctx: &mut SagaContext,
        input: Self::Input,
    ) -> Result<SagaOutcome, SagaError>;
}
