use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{ResourceState, SagaState};
use tokio::sync::RwLock;

use crate::traits::{KeyValueStore, LivenessStore, ResourceStore, SagaStore};
use crate::{Result, StoreError};

/// In-memory key/value store for tests and single-node setups.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut values = self.values.write().await;
        if values.contains_key(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// In-memory resource state store.
#[derive(Clone, Default)]
pub struct InMemoryResourceStore {
    states: Arc<RwLock<HashMap<String, ResourceState>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, key: &str) -> Result<Option<ResourceState>> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, state: ResourceState) -> Result<()> {
        self.states.write().await.insert(key.to_string(), state);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.states.write().await.remove(key);
        Ok(())
    }
}

/// In-memory saga state store.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    states: Arc<RwLock<HashMap<String, SagaState>>>,
}

impl InMemorySagaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn get(&self, key: &str) -> Result<Option<SagaState>> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, state: SagaState) -> Result<()> {
        self.states.write().await.insert(key.to_string(), state);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.states.write().await.remove(key);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<(String, SagaState)>> {
        let states = self.states.read().await;
        Ok(states
            .iter()
            .map(|(key, state)| (key.clone(), state.clone()))
            .collect())
    }
}

/// In-memory liveness set.
#[derive(Clone, Default)]
pub struct InMemoryLivenessStore {
    keys: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryLivenessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LivenessStore for InMemoryLivenessStore {
    async fn add(&self, key: &str) -> Result<()> {
        self.keys.write().await.insert(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.keys.write().await.remove(key);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<String>> {
        Ok(self.keys.read().await.iter().cloned().collect())
    }
}
