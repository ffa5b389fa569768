use common::OperationResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Domain extension point for a resource kind.
///
/// Implementations hold the typed inner state and define the four domain
/// handlers over a closed action enum. Everything else — sequence checking,
/// response caching, the prepared-actions pairing rule, persistence — is
/// handled by [`Resource`] and must not be duplicated per resource type.
///
/// Handlers return failures as `OperationResponse { success: false, .. }`
/// values; they are expected outcomes, not errors.
///
/// [`Resource`]: crate::Resource
pub trait ResourceBehavior: Default + Serialize + DeserializeOwned + Send + 'static {
    /// Closed set of actions this resource understands. Payloads that do
    /// not deserialize into it are answered with "Unknown action".
    type Action: Serialize + DeserializeOwned + Send;

    /// Stable logical type name, the `kind` half of the resource's key.
    fn kind() -> &'static str;

    /// Validates an action and reserves whatever it needs to guarantee a
    /// later Confirm cannot fail. On success the action becomes pending.
    fn prepare(&mut self, action: &Self::Action) -> OperationResponse;

    /// Applies a previously prepared action.
    fn confirm(&mut self, action: &Self::Action) -> OperationResponse;

    /// Releases whatever a previously prepared action reserved.
    fn cancel(&mut self, action: &Self::Action) -> OperationResponse;

    /// Applies a single-step, non-compensable action directly.
    fn execute(&mut self, action: &Self::Action) -> OperationResponse;
}
