use common::ActorKey;
use futures_util::future::join_all;
use state_store::{LivenessStore, StoreError};

use crate::node::Node;

/// Recovery sweep: re-delivers a trigger to every saga in the liveness
/// set.
///
/// Run on startup or topology change. Each triggered saga either resumes
/// its body from the persisted input or, finding no persisted state,
/// drops its own stale liveness entry. Individual delivery failures are
/// logged and skipped so one broken entry cannot stall the sweep; the
/// next sweep retries them.
///
/// Returns the number of entries triggered.
pub async fn trigger_live_sagas(
    node: &Node,
    liveness: &dyn LivenessStore,
) -> Result<usize, StoreError> {
    let keys = liveness.scan().await?;
    tracing::info!(count = keys.len(), "sweeping live sagas");

    let triggers = keys.iter().map(|key| async move {
        let target = match key.parse::<ActorKey>() {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!(%key, %error, "unparseable liveness entry");
                return;
            }
        };
        if let Err(error) = node.trigger(&target).await {
            tracing::warn!(%target, %error, "failed to trigger saga");
        }
    });
    join_all(triggers).await;

    Ok(keys.len())
}
