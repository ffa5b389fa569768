use async_trait::async_trait;
use common::ResourceState;

use crate::Result;
use crate::traits::{KeyValueStore, ResourceStore};

/// Adapter projecting [`ResourceStore`] onto any [`KeyValueStore`] via
/// serde_json blobs.
///
/// Saga stores are not adapted this way: they need `scan` for recovery
/// sweeps, which the key/value contract does not offer.
#[derive(Clone)]
pub struct KvResourceStore<S> {
    inner: S,
}

impl<S: KeyValueStore> KvResourceStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: KeyValueStore> ResourceStore for KvResourceStore<S> {
    async fn get(&self, key: &str) -> Result<Option<ResourceState>> {
        match self.inner.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, state: ResourceState) -> Result<()> {
        self.inner.update(key, serde_json::to_vec(&state)?).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}
