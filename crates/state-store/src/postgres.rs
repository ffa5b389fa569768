use async_trait::async_trait;
use common::{ResourceState, SagaState};
use sqlx::{PgPool, Row};

use crate::traits::{KeyValueStore, LivenessStore, ResourceStore, SagaStore};
use crate::{Result, StoreError};

/// Runs the database migrations for all saga storage tables.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL-backed resource state store.
///
/// One row per resource identity in `resource_states`, state as JSONB,
/// rewritten wholesale on every mutation.
#[derive(Clone)]
pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    async fn get(&self, key: &str) -> Result<Option<ResourceState>> {
        let row = sqlx::query("SELECT state FROM resource_states WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let state: serde_json::Value = row.try_get("state")?;
                Ok(Some(serde_json::from_value(state)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, state: ResourceState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resource_states (key, state) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET state = excluded.state
            "#,
        )
        .bind(key)
        .bind(serde_json::to_value(&state)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM resource_states WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL-backed saga state store.
#[derive(Clone)]
pub struct PostgresSagaStore {
    pool: PgPool,
}

impl PostgresSagaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SagaStore for PostgresSagaStore {
    async fn get(&self, key: &str) -> Result<Option<SagaState>> {
        let row = sqlx::query("SELECT state FROM saga_states WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let state: serde_json::Value = row.try_get("state")?;
                Ok(Some(serde_json::from_value(state)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, state: SagaState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO saga_states (key, state) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET state = excluded.state
            "#,
        )
        .bind(key)
        .bind(serde_json::to_value(&state)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM saga_states WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<(String, SagaState)>> {
        let rows = sqlx::query("SELECT key, state FROM saga_states")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let key: String = row.try_get("key")?;
                let state: serde_json::Value = row.try_get("state")?;
                Ok((key, serde_json::from_value(state)?))
            })
            .collect()
    }
}

/// PostgreSQL-backed liveness set.
#[derive(Clone)]
pub struct PostgresLivenessStore {
    pool: PgPool,
}

impl PostgresLivenessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LivenessStore for PostgresLivenessStore {
    async fn add(&self, key: &str) -> Result<()> {
        sqlx::query("INSERT INTO live_sagas (key) VALUES ($1) ON CONFLICT (key) DO NOTHING")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM live_sagas WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar("SELECT key FROM live_sagas")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

/// PostgreSQL-backed key/value store over a BYTEA column.
#[derive(Clone)]
pub struct PostgresKeyValueStore {
    pool: PgPool,
}

impl PostgresKeyValueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PostgresKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM kv_states WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        sqlx::query("INSERT INTO kv_states (key, value) VALUES ($1, $2)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::DuplicateKey(key.to_string());
                }
                StoreError::Database(e)
            })?;
        Ok(())
    }

    async fn update(&self, key: &str, value: Vec<u8>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_states (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_states WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
