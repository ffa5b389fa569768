use async_trait::async_trait;
use common::{ResourceState, SagaState};

use crate::Result;

/// Keyed blob store for embedders that bring their own encoding.
///
/// `put` inserts and fails with [`StoreError::DuplicateKey`] if the key is
/// present; `update` writes unconditionally. Keys follow the
/// `"{kind}/{identity}"` format used by every store in this crate.
///
/// [`StoreError::DuplicateKey`]: crate::StoreError::DuplicateKey
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn update(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Store for [`ResourceState`] blobs, one per resource identity.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ResourceState>>;

    async fn set(&self, key: &str, state: ResourceState) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Store for [`SagaState`] blobs, one per saga identity.
///
/// `scan` exists for recovery sweeps: it returns every persisted saga so a
/// sweep can re-deliver a resume signal to each.
#[async_trait]
pub trait SagaStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SagaState>>;

    async fn set(&self, key: &str, state: SagaState) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn scan(&self) -> Result<Vec<(String, SagaState)>>;
}

/// Set of saga identities currently considered in-flight.
///
/// `add` is idempotent. Recovery sweeps `scan` this set and trigger every
/// entry; a stale entry (saga already cleaned up) self-heals when the
/// triggered saga finds no persisted state.
#[async_trait]
pub trait LivenessStore: Send + Sync {
    async fn add(&self, key: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn scan(&self) -> Result<Vec<String>>;
}
