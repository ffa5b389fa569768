use serde::{Deserialize, Serialize};

/// The phase of the resource protocol an operation belongs to.
///
/// Prepare/Confirm/Cancel form the compensable three-phase flow; Execute is
/// a single-step, non-compensable operation with no pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Prepare,
    Confirm,
    Cancel,
    Execute,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Prepare => "Prepare",
            OperationType::Confirm => "Confirm",
            OperationType::Cancel => "Cancel",
            OperationType::Execute => "Execute",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One operation sent by an orchestrator to a resource.
///
/// `caller_id` is the orchestrator's own `"{kind}/{id}"` key; `sequence` is
/// scoped to the (caller, resource) pair and must arrive dense and
/// increasing. The action payload is opaque at this layer; each resource
/// deserializes it into its own closed action enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub caller_id: String,
    pub sequence: i64,
    pub operation_type: OperationType,
    pub action: serde_json::Value,
}

/// Reply to every resource operation.
///
/// Rejections and domain failures are values (`success: false`), never
/// errors. Responses are cached verbatim by the resource and replayed for
/// retried sequences, so equality with the original reply is observable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl OperationResponse {
    /// A successful response with no payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A successful response carrying a payload for the caller.
    pub fn ok_with_payload(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// A failed response with an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}
