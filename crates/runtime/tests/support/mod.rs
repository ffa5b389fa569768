//! Bank-account fixture shared by the integration tests: an `Account`
//! resource and the three sagas that drive it.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{ActorKey, Operation, OperationResponse, OperationType, SagaState};
use resource::ResourceBehavior;
use runtime::Node;
use saga::{SagaBehavior, SagaContext, SagaError, SagaOutcome};
use serde::{Deserialize, Serialize};
use state_store::{
    InMemoryLivenessStore, InMemoryResourceStore, InMemorySagaStore, ResourceStore,
};

pub const ACCOUNT_KIND: &str = "Account";

/// One bank account. Prepared subtractions block funds until confirmed
/// or cancelled, so concurrent sagas cannot overdraw.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Account {
    pub exists: bool,
    pub total_funds: i64,
    pub blocked_funds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountAction {
    Create,
    Get,
    Add { amount: i64 },
    Subtract { amount: i64 },
}

impl ResourceBehavior for Account {
    type Action = AccountAction;

    fn kind() -> &'static str {
        ACCOUNT_KIND
    }

    fn prepare(&mut self, action: &Self::Action) -> OperationResponse {
        match action {
            AccountAction::Add { amount } => {
                if !self.exists {
                    return OperationResponse::error("Account does not exist");
                }
                if *amount <= 0 {
                    return OperationResponse::error("Amount must be positive");
                }
                OperationResponse::ok()
            }
            AccountAction::Subtract { amount } => {
                if !self.exists {
                    return OperationResponse::error("Account does not exist");
                }
                if *amount <= 0 {
                    return OperationResponse::error("Amount must be positive");
                }
                if self.total_funds - self.blocked_funds < *amount {
                    return OperationResponse::error("Insufficient funds");
                }
                self.blocked_funds += amount;
                OperationResponse::ok()
            }
            _ => OperationResponse::error("Unknown action"),
        }
    }

    fn confirm(&mut self, action: &Self::Action) -> OperationResponse {
        match action {
            AccountAction::Add { amount } => {
                self.total_funds += amount;
                OperationResponse::ok()
            }
            AccountAction::Subtract { amount } => {
                self.total_funds -= amount;
                self.blocked_funds -= amount;
                OperationResponse::ok()
            }
            _ => OperationResponse::error("Unknown action"),
        }
    }

    fn cancel(&mut self, action: &Self::Action) -> OperationResponse {
        match action {
            AccountAction::Add { .. } => OperationResponse::ok(),
            AccountAction::Subtract { amount } => {
                self.blocked_funds -= amount;
                OperationResponse::ok()
            }
            _ => OperationResponse::error("Unknown action"),
        }
    }

    fn execute(&mut self, action: &Self::Action) -> OperationResponse {
        match action {
            AccountAction::Create => {
                if self.exists {
                    return OperationResponse::error("Already exists");
                }
                self.exists = true;
                OperationResponse::ok()
            }
            AccountAction::Get => OperationResponse::ok_with_payload(serde_json::json!({
                "exists": self.exists,
                "total_funds": self.total_funds,
                "blocked_funds": self.blocked_funds,
            })),
            _ => OperationResponse::error("Unknown action"),
        }
    }
}

fn reason(response: &OperationResponse) -> String {
    response
        .error_message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountInput {
    pub account_id: String,
}

pub struct CreateAccountSaga;

#[async_trait]
impl SagaBehavior for CreateAccountSaga {
    type Input = CreateAccountInput;

    fn kind() -> &'static str {
        "CreateAccountSaga"
    }

    async fn run(
        &self,
        ctx: &mut SagaContext,
        input: Self::Input,
    ) -> Result<SagaOutcome, SagaError> {
        let response = ctx
            .execute(ACCOUNT_KIND, &input.account_id, &AccountAction::Create)
            .await?;
        if response.success {
            Ok(SagaOutcome::success())
        } else {
            Ok(SagaOutcome::failure(reason(&response)))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddFundsInput {
    pub account_id: String,
    pub amount: i64,
}

pub struct AddFundsSaga;

#[async_trait]
impl SagaBehavior for AddFundsSaga {
    type Input = AddFundsInput;

    fn kind() -> &'static str {
        "AddFundsSaga"
    }

    async fn run(
        &self,
        ctx: &mut SagaContext,
        input: Self::Input,
    ) -> Result<SagaOutcome, SagaError> {
        let add = AccountAction::Add {
            amount: input.amount,
        };

        let prepared = ctx.prepare(ACCOUNT_KIND, &input.account_id, &add).await?;
        if !prepared.success {
            return Ok(SagaOutcome::failure(reason(&prepared)));
        }

        ctx.confirm(ACCOUNT_KIND, &input.account_id, &add).await?;
        Ok(SagaOutcome::success())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferFundsInput {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: i64,
}

pub struct TransferFundsSaga;

#[async_trait]
impl SagaBehavior for TransferFundsSaga {
    type Input = TransferFundsInput;

    fn kind() -> &'static str {
        "TransferFundsSaga"
    }

    async fn run(
        &self,
        ctx: &mut SagaContext,
        input: Self::Input,
    ) -> Result<SagaOutcome, SagaError> {
        let subtract = AccountAction::Subtract {
            amount: input.amount,
        };
        let add = AccountAction::Add {
            amount: input.amount,
        };

        let prepared_subtract = ctx
            .prepare(ACCOUNT_KIND, &input.from_account_id, &subtract)
            .await?;
        if !prepared_subtract.success {
            return Ok(SagaOutcome::failure(reason(&prepared_subtract)));
        }

        let prepared_add = ctx
            .prepare(ACCOUNT_KIND, &input.to_account_id, &add)
            .await?;
        if !prepared_add.success {
            ctx.cancel(ACCOUNT_KIND, &input.from_account_id, &subtract)
                .await?;
            return Ok(SagaOutcome::failure(reason(&prepared_add)));
        }

        ctx.confirm(ACCOUNT_KIND, &input.from_account_id, &subtract)
            .await?;
        ctx.confirm(ACCOUNT_KIND, &input.to_account_id, &add).await?;
        Ok(SagaOutcome::success())
    }
}

/// One node wired with the bank fixture over in-memory stores.
pub struct Harness {
    pub node: Node,
    pub accounts: Arc<InMemoryResourceStore>,
    pub sagas: Arc<InMemorySagaStore>,
    pub liveness: Arc<InMemoryLivenessStore>,
}

impl Harness {
    pub async fn new() -> Self {
        init_tracing();
        let node = Node::new();
        let accounts = Arc::new(InMemoryResourceStore::new());
        let sagas = Arc::new(InMemorySagaStore::new());
        let liveness = Arc::new(InMemoryLivenessStore::new());

        node.register_resource::<Account>(accounts.clone()).await;
        node.register_saga(CreateAccountSaga, sagas.clone(), liveness.clone())
            .await;
        node.register_saga(AddFundsSaga, sagas.clone(), liveness.clone())
            .await;
        node.register_saga(TransferFundsSaga, sagas.clone(), liveness.clone())
            .await;

        Self {
            node,
            accounts,
            sagas,
            liveness,
        }
    }

    /// Runs a CreateAccountSaga to completion.
    pub async fn create_account(&self, account_id: &str) {
        let saga = ActorKey::new(CreateAccountSaga::kind(), format!("create-{account_id}"));
        self.node
            .start_saga(
                &saga,
                &CreateAccountInput {
                    account_id: account_id.to_string(),
                },
            )
            .await
            .unwrap();
        let state = self.completed(&saga).await;
        assert!(state.result.succeeded, "account creation failed");
        self.retired(&saga).await;
    }

    /// Runs an AddFundsSaga to completion.
    pub async fn add_funds(&self, account_id: &str, amount: i64) {
        let saga = ActorKey::new(AddFundsSaga::kind(), format!("add-{account_id}-{amount}"));
        self.node
            .start_saga(
                &saga,
                &AddFundsInput {
                    account_id: account_id.to_string(),
                    amount,
                },
            )
            .await
            .unwrap();
        let state = self.completed(&saga).await;
        assert!(state.result.succeeded, "adding funds failed");
        self.retired(&saga).await;
    }

    /// Starts a TransferFundsSaga and awaits its completed state.
    pub async fn transfer(
        &self,
        saga_id: &str,
        from: &str,
        to: &str,
        amount: i64,
    ) -> SagaState {
        let saga = ActorKey::new(TransferFundsSaga::kind(), saga_id);
        self.node
            .start_saga(
                &saga,
                &TransferFundsInput {
                    from_account_id: from.to_string(),
                    to_account_id: to.to_string(),
                    amount,
                },
            )
            .await
            .unwrap();
        self.completed(&saga).await
    }

    pub async fn completed(&self, saga: &ActorKey) -> SagaState {
        self.node
            .state_when_completed(saga)
            .await
            .unwrap()
            .expect("saga was never initialized")
    }

    /// Blocks until the saga's cleanup has finished: the query is
    /// sequenced behind it on the saga's own queue.
    pub async fn retired(&self, saga: &ActorKey) {
        assert_eq!(self.node.current_state(saga).await.unwrap(), None);
    }

    /// Reads an account's domain state straight from the backing store.
    pub async fn account(&self, account_id: &str) -> Account {
        let state = self
            .accounts
            .get(&format!("{ACCOUNT_KIND}/{account_id}"))
            .await
            .unwrap()
            .expect("account was never persisted");
        serde_json::from_value(state.inner_state).unwrap()
    }

    /// Sends a raw operation to an account, the way an orchestrator would.
    pub async fn operation(
        &self,
        account_id: &str,
        caller_id: &str,
        sequence: i64,
        operation_type: OperationType,
        action: AccountAction,
    ) -> OperationResponse {
        self.node
            .operation(
                &ActorKey::new(ACCOUNT_KIND, account_id),
                Operation {
                    caller_id: caller_id.to_string(),
                    sequence,
                    operation_type,
                    action: serde_json::to_value(action).unwrap(),
                },
            )
            .await
            .unwrap()
    }
}

/// Opt-in test logging: `RUST_LOG=debug cargo test -p runtime`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `condition` until it holds, panicking after a generous deadline.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within deadline");
}
