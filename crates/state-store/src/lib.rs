//! Storage contracts consumed by the saga coordination protocol, with
//! volatile in-memory and PostgreSQL-backed implementations.
//!
//! Each persisted blob (one per resource identity, one per saga identity)
//! is read once at activation and rewritten wholesale on every mutation;
//! there are no partial field updates and no cross-identity transactions.

pub mod config;
pub mod error;
pub mod kv;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use config::{StorageBackend, StorageConfig};
pub use error::{Result, StoreError};
pub use kv::KvResourceStore;
pub use memory::{
    InMemoryKeyValueStore, InMemoryLivenessStore, InMemoryResourceStore, InMemorySagaStore,
};
pub use postgres::{
    PostgresKeyValueStore, PostgresLivenessStore, PostgresResourceStore, PostgresSagaStore,
    run_migrations,
};
pub use traits::{KeyValueStore, LivenessStore, ResourceStore, SagaStore};
