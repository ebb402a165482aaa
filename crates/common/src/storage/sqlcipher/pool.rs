//! SQLCipher connection pool.
//!
//! Provides an r2d2-based connection pool for SQLCipher encrypted databases.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// Raw pooled connection, for callers that need direct `rusqlite` semantics
/// (e.g. `rusqlite::OptionalExtension`) rather than [`SqlCipherConnection`]'s
/// `StorageError`-returning wrapper methods.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

fn is_wrong_key_error(err_str: &str) -> bool {
    err_str.contains("file is not a database")
        || err_str.contains("file is encrypted")
        || err_str.contains("database disk image is malformed")
        || err_str.contains("notadb")
}

/// Pool of encrypted SQLite connections.
///
/// Each connection has the SQLCipher key and pragmas applied on creation via
/// an r2d2 connection-manager init hook, so callers never see an
/// unencrypted or unconfigured connection.
#[derive(Debug, Clone)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
}

impl SqlCipherPool {
    /// Open (or create) a SQLCipher database at `path` with the given key.
    ///
    /// # Errors
    /// Returns [`StorageError::WrongKeyOrNotEncrypted`] if the key does not
    /// match an existing database, or another [`StorageError`] variant if the
    /// pool cannot be built.
    #[instrument(skip(encryption_key), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!("creating sqlcipher connection pool");

        let cipher_config = SqlCipherConfig::new(encryption_key);
        let pool_config = config.clone();
        let cipher_config_clone = cipher_config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config_clone)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("failed to create connection pool: {e}");
                let err_str = e.to_string().to_lowercase();
                if is_wrong_key_error(&err_str) {
                    StorageError::WrongKeyOrNotEncrypted
                } else {
                    StorageError::Connection(format!("failed to create pool: {e}"))
                }
            })?;

        let conn = pool.get().map_err(|e| {
            warn!("failed to get test connection: {e}");
            let err_str = e.to_string().to_lowercase();
            if is_wrong_key_error(&err_str) {
                StorageError::WrongKeyOrNotEncrypted
            } else {
                StorageError::Connection(format!("failed to get test connection: {e}"))
            }
        })?;
        verify_encryption(&conn)?;
        debug!("encryption verified successfully");
        drop(conn);

        info!("sqlcipher pool created with {} connections", config.max_size);
        Ok(Self { pool, config })
    }

    /// Borrow a connection from the pool.
    ///
    /// # Errors
    /// Returns [`StorageError::Timeout`] if no connection becomes available
    /// before the configured timeout, or [`StorageError::Connection`] for
    /// other pool failures.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        self.pool.get().map(SqlCipherConnection::new).map_err(|e| {
            let err_str = e.to_string().to_lowercase();
            if err_str.contains("timeout") {
                warn!("connection timeout after {:?}", self.config.connection_timeout);
                StorageError::Timeout(self.config.connection_timeout.as_secs())
            } else {
                warn!("connection error: {e}");
                StorageError::Connection(format!("failed to get connection: {e}"))
            }
        })
    }

    /// Check whether the pool can currently hand out a working connection.
    ///
    /// # Errors
    /// Never returns `Err`; failures are reported as `false` so callers don't
    /// need to match on storage error variants for a liveness check.
    pub fn health_check(&self) -> bool {
        self.pool.get().is_ok()
    }

    /// The underlying r2d2 pool, for callers that need a raw connection
    /// rather than this module's `StorageError`-wrapped one.
    pub fn raw_pool(&self) -> &Pool<SqliteConnectionManager> {
        &self.pool
    }
}
