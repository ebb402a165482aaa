//! SQLCipher-backed connection pool.
//!
//! Key application, pragma configuration, and pooling are delegated to
//! `chronarc_common::storage::sqlcipher`. Schema migrations stay here:
//! they're an application-layer concern, not something the shared pool
//! wrapper should know about.

use std::path::Path;

use chronarc_common::storage::sqlcipher::{PooledConnection, SqlCipherPool, SqlCipherPoolConfig};
use chronarc_domain::{ChronarcError, Result};
use rusqlite::params;
use tracing::instrument;

const SCHEMA: &str = include_str!("schema.sql");
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Pooled handle to the Chronarc SQLCipher database.
#[derive(Clone)]
pub struct DbPool {
    inner: SqlCipherPool,
}

impl DbPool {
    /// Opens (creating if absent) the database at `path`, keyed with
    /// `encryption_key`, and applies schema migrations.
    ///
    /// # Errors
    /// Returns an error if the key is rejected or the pool cannot be built.
    #[instrument(skip(encryption_key), fields(db_path = ?path))]
    pub fn open(path: &Path, encryption_key: String, max_size: u32) -> Result<Self> {
        let config = SqlCipherPoolConfig { max_size: max_size.max(1), ..SqlCipherPoolConfig::default() };
        let inner = SqlCipherPool::new(path, encryption_key, config)
            .map_err(|e| ChronarcError::Internal(format!("failed to open database: {e}")))?;
        let db = Self { inner };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory pool for tests. Pinned to a single connection: every new
    /// connection to `:memory:` is its own private database, so a pool of
    /// more than one would silently lose writes across connections.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be built.
    pub fn open_in_memory() -> Result<Self> {
        let key = chronarc_common::generate_encryption_key();
        let config = SqlCipherPoolConfig { max_size: 1, ..SqlCipherPoolConfig::default() };
        let inner = SqlCipherPool::new(Path::new(":memory:"), key.expose().to_string(), config)
            .map_err(|e| ChronarcError::Internal(format!("failed to open database: {e}")))?;
        let db = Self { inner };
        db.run_migrations()?;
        Ok(db)
    }

    /// Borrows a raw pooled connection. Derefs to `rusqlite::Connection`, so
    /// callers use `rusqlite::OptionalExtension` and friends directly.
    ///
    /// # Errors
    /// Returns an error if the pool is exhausted or a connection cannot be
    /// checked out.
    pub fn get(&self) -> Result<PooledConnection> {
        self.inner
            .raw_pool()
            .get()
            .map_err(|e| ChronarcError::Internal(format!("failed to acquire db connection: {e}")))
    }

    /// Round-trips a trivial query to confirm the pool is alive and the key
    /// (if any) was accepted.
    pub fn health_check(&self) -> bool {
        self.inner.health_check()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.get()?;
        conn.execute_batch(SCHEMA)?;

        let applied: i64 = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))?;
        if applied == 0 {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![CURRENT_SCHEMA_VERSION],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn in_memory_pool_runs_migrations_and_is_healthy() {
        let pool = DbPool::open_in_memory().unwrap();
        assert!(pool.health_check());

        let conn = pool.get().unwrap();
        let version: i64 =
            conn.query_row("SELECT version FROM schema_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent_across_pool_opens() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let key = chronarc_common::generate_encryption_key().expose().to_string();

        {
            let pool = DbPool::open(&db_path, key.clone(), 4).unwrap();
            assert!(pool.health_check());
        }

        let pool = DbPool::open(&db_path, key, 4).unwrap();
        let conn = pool.get().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
