use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use common::{ActorKey, Envelope, Request, Response, SagaResult, SagaState};
use futures_util::FutureExt;
use futures_util::future::join_all;
use state_store::{LivenessStore, SagaStore};
use tokio::sync::{mpsc, oneshot};

use crate::behavior::{SagaBehavior, SagaOutcome};
use crate::context::SagaContext;
use crate::error::SagaError;
use crate::transport::SagaTransport;

/// What a finished body run hands back to the worker: the verdict (or the
/// infrastructure failure that cut it short) plus the participants the
/// run's context accumulated.
struct BodyCompletion {
    result: Result<SagaOutcome, SagaError>,
    participants: BTreeSet<String>,
    started_at: Instant,
}

/// Spawns the worker task serving one saga identity and returns its
/// command queue.
///
/// The worker recovers persisted state on activation and then processes
/// envelopes strictly one at a time. The body runs on its own task so the
/// worker stays free to observe (and, while busy, ignore) duplicate input
/// and trigger deliveries; the body's completion comes back to the worker
/// as just another queued step, so every mutation of the saga's own state
/// happens on the worker's exclusive turn.
pub fn spawn<B: SagaBehavior>(
    behavior: Arc<B>,
    key: ActorKey,
    store: Arc<dyn SagaStore>,
    liveness: Arc<dyn LivenessStore>,
    transport: Arc<dyn SagaTransport>,
) -> mpsc::UnboundedSender<Envelope> {
    let (tx, rx) = mpsc::unbounded_channel::<Envelope>();

    tokio::spawn(async move {
        let state = match store.get(&key.to_string()).await {
            Ok(state) => state,
            Err(error) => {
                tracing::error!(%key, %error, "failed to activate saga");
                return;
            }
        };
        tracing::debug!(%key, recovered = state.is_some(), "saga activated");

        let (completion_tx, completion_rx) = mpsc::channel(1);
        let orchestrator = Orchestrator {
            behavior,
            key,
            state,
            store,
            liveness,
            transport,
            busy: false,
            waiters: Vec::new(),
            completion_tx,
        };
        orchestrator.serve(rx, completion_rx).await;
    });

    tx
}

/// One activated saga identity: the persisted state (if any), the busy
/// flag making body execution single-flight, and the parked
/// completion-state waiters.
struct Orchestrator<B: SagaBehavior> {
    behavior: Arc<B>,
    key: ActorKey,
    state: Option<SagaState>,
    store: Arc<dyn SagaStore>,
    liveness: Arc<dyn LivenessStore>,
    transport: Arc<dyn SagaTransport>,
    busy: bool,
    waiters: Vec<oneshot::Sender<Response>>,
    completion_tx: mpsc::Sender<BodyCompletion>,
}

impl<B: SagaBehavior> Orchestrator<B> {
    async fn serve(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Envelope>,
        mut completion_rx: mpsc::Receiver<BodyCompletion>,
    ) {
        loop {
            // Envelopes already queued win over a simultaneous body
            // completion, so a completion waiter sent while the body was
            // in flight is parked before the completion answers it.
            tokio::select! {
                biased;
                maybe_envelope = rx.recv() => match maybe_envelope {
                    Some(envelope) => self.handle_envelope(envelope).await,
                    None => break,
                },
                Some(completion) = completion_rx.recv(), if self.busy => {
                    self.handle_completion(completion).await;
                }
            }
        }
    }

    #[tracing::instrument(skip_all, fields(key = %self.key))]
    async fn handle_envelope(&mut self, envelope: Envelope) {
        tracing::debug!(request = ?envelope.request, "saga received request");

        match envelope.request {
            Request::Input(input) => {
                let _ = envelope.reply.send(Response::Ack);
                self.handle_input(input).await;
            }
            Request::Trigger => {
                let _ = envelope.reply.send(Response::Ack);
                self.handle_trigger().await;
            }
            Request::GetCurrentState => {
                let _ = envelope.reply.send(Response::State(self.state.clone()));
            }
            Request::GetStateWhenCompleted => match &self.state {
                None => {
                    let _ = envelope.reply.send(Response::State(None));
                }
                Some(state) if state.result.completed => {
                    let _ = envelope.reply.send(Response::State(Some(state.clone())));
                }
                Some(_) => self.waiters.push(envelope.reply),
            },
            other => {
                tracing::debug!(request = ?other, "request not addressed to a saga");
                let _ = envelope.reply.send(Response::Ack);
            }
        }
    }

    /// First input initializes and runs the saga; duplicates are ignored
    /// while busy, re-run an interrupted saga, or re-enter cleanup for a
    /// completed one.
    async fn handle_input(&mut self, input: serde_json::Value) {
        if self.busy {
            tracing::debug!("saga is busy, ignoring input");
            return;
        }

        if self.state.is_none() {
            // The liveness entry goes in first: a crash between the two
            // writes leaves a stale entry that self-heals on trigger,
            // while the reverse order would leave an unrecoverable saga.
            let key = self.key.to_string();
            if let Err(error) = self.liveness.add(&key).await {
                tracing::error!(%error, "failed to mark saga live");
                return;
            }
            let state = SagaState::new(input);
            if let Err(error) = self.store.set(&key, state.clone()).await {
                tracing::error!(%error, "failed to persist saga state");
                return;
            }
            self.state = Some(state);
            metrics::counter!("saga_started_total").increment(1);
            tracing::info!("saga initialized");
        }

        self.run_or_clean_up().await;
    }

    /// Recovery signal. A trigger for an identity with no persisted state
    /// means the saga already completed and cleaned up but its liveness
    /// entry lagged; drop the entry and retire.
    async fn handle_trigger(&mut self) {
        if self.busy {
            tracing::debug!("saga is busy, ignoring trigger");
            return;
        }

        if self.state.is_none() {
            tracing::warn!(key = %self.key, "no state for triggered saga, dropping stale liveness entry");
            if let Err(error) = self.liveness.delete(&self.key.to_string()).await {
                tracing::error!(%error, "failed to drop stale liveness entry");
            }
            return;
        }

        self.run_or_clean_up().await;
    }

    async fn run_or_clean_up(&mut self) {
        let Some(state) = &self.state else { return };
        if state.result.completed {
            // Completed but still persisted: a previous cleanup was
            // interrupted. Finish it.
            self.clean_up().await;
        } else {
            self.start_body(state.input.clone());
        }
    }

    /// Spawns the body on its own task. The worker keeps serving its
    /// queue while the body is in flight; the completion arrives through
    /// `completion_tx` and is applied on the worker's own turn.
    fn start_body(&mut self, input: serde_json::Value) {
        let input = match serde_json::from_value::<B::Input>(input) {
            Ok(input) => input,
            Err(error) => {
                tracing::error!(%error, "persisted saga input does not deserialize");
                return;
            }
        };

        self.busy = true;
        let behavior = self.behavior.clone();
        let transport = self.transport.clone();
        let caller_id = self.key.to_string();
        let completion_tx = self.completion_tx.clone();
        let started_at = Instant::now();

        tokio::spawn(async move {
            let mut ctx = SagaContext::new(caller_id, transport);
            let result = std::panic::AssertUnwindSafe(behavior.run(&mut ctx, input))
                .catch_unwind()
                .await
                .unwrap_or(Err(SagaError::BodyPanicked));
            let _ = completion_tx
                .send(BodyCompletion {
                    result,
                    participants: ctx.into_participants(),
                    started_at,
                })
                .await;
        });
    }

    async fn handle_completion(&mut self, completion: BodyCompletion) {
        let Some(state) = self.state.as_mut() else {
            self.busy = false;
            return;
        };
        state
            .participants_to_clean_up
            .extend(completion.participants);

        let outcome = match completion.result {
            Ok(outcome) => outcome,
            Err(error) => {
                // Infrastructure failure: the saga stays incomplete and a
                // later trigger runs the body again.
                tracing::error!(key = %self.key, %error, "saga body failed");
                self.busy = false;
                return;
            }
        };

        state.result = SagaResult {
            completed: true,
            succeeded: outcome.succeeded,
            error_messages: outcome.error_messages,
        };
        if let Err(error) = self.store.set(&self.key.to_string(), state.clone()).await {
            tracing::error!(key = %self.key, %error, "failed to persist saga completion");
            self.busy = false;
            return;
        }

        metrics::counter!("saga_completed_total").increment(1);
        if !state.result.succeeded {
            metrics::counter!("saga_failed_total").increment(1);
        }
        metrics::histogram!("saga_duration_seconds")
            .record(completion.started_at.elapsed().as_secs_f64());
        tracing::info!(key = %self.key, succeeded = state.result.succeeded, "saga completed");

        let completed = Response::State(Some(state.clone()));
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(completed.clone());
        }
        self.busy = false;

        self.clean_up().await;
    }

    /// Wipes this saga's ledger on every participant, deletes the
    /// persisted state and the liveness entry, and retires the identity
    /// back to uninitialized. Each step is safe to re-run, so an
    /// interruption anywhere is repaired by the next trigger.
    async fn clean_up(&mut self) {
        let Some(state) = &self.state else { return };
        let caller_id = self.key.to_string();

        let wipes = state.participants_to_clean_up.iter().map(|participant| {
            let transport = self.transport.clone();
            let caller_id = caller_id.clone();
            async move {
                match participant.parse::<ActorKey>() {
                    Ok(target) => {
                        if let Err(error) = transport.wipe_participant(&target, &caller_id).await {
                            tracing::warn!(%target, %error, "failed to wipe participant ledger");
                        }
                    }
                    Err(error) => tracing::warn!(%error, "unparseable participant key"),
                }
            }
        });
        join_all(wipes).await;

        if let Err(error) = self.store.delete(&caller_id).await {
            // State survives, so a later trigger finds it completed and
            // re-enters cleanup.
            tracing::error!(key = %self.key, %error, "failed to delete saga state");
            return;
        }
        if let Err(error) = self.liveness.delete(&caller_id).await {
            tracing::warn!(key = %self.key, %error, "failed to drop liveness entry");
        }

        self.state = None;
        tracing::info!(key = %self.key, "saga cleaned up");
    }
}
