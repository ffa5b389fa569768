//! Storage configuration loaded from environment variables.

/// Which backend the stores run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Volatile in-process maps. The default; right for tests and
    /// single-node deployments that can afford to lose state.
    Memory,
    /// PostgreSQL tables behind a connection pool.
    Postgres { url: String },
}

/// Storage configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `STORE_BACKEND` — `"memory"` or `"postgres"` (default: `"memory"`)
/// - `DATABASE_URL` — connection string, required for `postgres`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl StorageConfig {
    /// Loads configuration from environment variables, falling back to the
    /// in-memory backend when `postgres` is requested without a URL.
    pub fn from_env() -> Self {
        let backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("postgres") => match std::env::var("DATABASE_URL") {
                Ok(url) => StorageBackend::Postgres { url },
                Err(_) => StorageBackend::Memory,
            },
            _ => StorageBackend::Memory,
        };
        Self { backend }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_memory() {
        assert_eq!(StorageConfig::default().backend, StorageBackend::Memory);
    }
}
