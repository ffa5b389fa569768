use std::sync::Arc;

use common::{ActorKey, Envelope, Request, Response};
use state_store::ResourceStore;
use tokio::sync::mpsc;

use crate::behavior::ResourceBehavior;
use crate::resource::Resource;

/// Spawns the worker task serving one resource identity and returns its
/// command queue.
///
/// The worker activates the resource (recover-or-default), then processes
/// envelopes strictly one at a time. A persistence failure is fatal for the
/// in-flight message: it is logged and the reply dropped, leaving retry to
/// the caller and restart to the supervisor.
pub fn spawn<B: ResourceBehavior + Sync>(
    key: ActorKey,
    store: Arc<dyn ResourceStore>,
) -> mpsc::UnboundedSender<Envelope> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

    tokio::spawn(async move {
        let mut resource = match Resource::<B>::activate(key.clone(), store).await {
            Ok(resource) => resource,
            Err(error) => {
                tracing::error!(%key, %error, "failed to activate resource");
                return;
            }
        };
        tracing::debug!(%key, "resource activated");

        while let Some(envelope) = rx.recv().await {
            match envelope.request {
                Request::Operation(operation) => {
                    match resource.handle_operation(&operation).await {
                        Ok(response) => {
                            let _ = envelope.reply.send(Response::Operation(response));
                        }
                        Err(error) => {
                            tracing::error!(%key, %error, "failed to persist resource state");
                        }
                    }
                }
                Request::WipeParticipant { caller_id } => {
                    match resource.wipe_caller(&caller_id).await {
                        Ok(()) => {
                            let _ = envelope.reply.send(Response::Ack);
                        }
                        Err(error) => {
                            tracing::error!(%key, %error, "failed to persist resource state");
                        }
                    }
                }
                other => {
                    tracing::debug!(%key, request = ?other, "request not addressed to a resource");
                    let _ = envelope.reply.send(Response::Ack);
                }
            }
        }
    });

    tx
}
