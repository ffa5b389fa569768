use thiserror::Error;

/// Errors surfaced by [`Node::request`] and the client helpers.
///
/// `NoReply` is the supervision seam: the worker accepted the request but
/// dropped the reply, which happens when it hits a fatal store error
/// mid-message. The messaging contract is at-least-once, so callers are
/// free to retry.
///
/// [`Node::request`]: crate::Node::request
#[derive(Debug, Error)]
pub enum RequestError {
    /// No spawner registered for the target's kind.
    #[error("No actor kind registered as {0:?}")]
    UnknownKind(String),

    /// The worker processed the request without replying.
    #[error("The actor dropped the reply")]
    NoReply,

    /// The worker answered with a response variant the helper did not
    /// expect for this request.
    #[error("Unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
