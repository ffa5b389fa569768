use state_store::StoreError;
use thiserror::Error;

/// Infrastructure failures inside a saga body or its orchestrator.
///
/// Domain failures are not errors: a body reports them by returning
/// [`SagaOutcome::failure`], which completes the saga with
/// `succeeded: false`. A body that returns `SagaError` instead leaves the
/// saga incomplete and resumable by a later trigger.
///
/// [`SagaOutcome::failure`]: crate::SagaOutcome::failure
#[derive(Debug, Error)]
pub enum SagaError {
    /// The messaging substrate failed to deliver a request or a reply.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store error occurred.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The saga body panicked.
    #[error("Saga body panicked")]
    BodyPanicked,
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
