//! SQLCipher encryption pragmas.
//!
//! Provides the pragma sequence needed to open and verify an encrypted
//! SQLite database.

use rusqlite::Connection;
use tracing::{debug, error};

use crate::security::encryption::SecureString;
use crate::storage::error::{StorageError, StorageResult};

/// SQLCipher key and KDF settings.
#[derive(Clone)]
pub struct SqlCipherConfig {
    pub key: SecureString,
    pub cipher_compatibility: i32,
    pub kdf_iter: i32,
    pub cipher_memory_security: bool,
}

impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &"SecureString(***)")
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .field("cipher_memory_security", &self.cipher_memory_security)
            .finish()
    }
}

impl SqlCipherConfig {
    pub fn new(key: String) -> Self {
        Self {
            key: SecureString::new(key),
            cipher_compatibility: 4,
            kdf_iter: 256000,
            cipher_memory_security: true,
        }
    }

    pub fn with_cipher_compatibility(mut self, version: i32) -> Self {
        self.cipher_compatibility = version;
        self
    }

    pub fn with_kdf_iter(mut self, iterations: i32) -> Self {
        self.kdf_iter = iterations;
        self
    }

    pub fn without_memory_security(mut self) -> Self {
        self.cipher_memory_security = false;
        self
    }
}

fn is_wrong_key_error(err_str: &str) -> bool {
    err_str.contains("file is not a database")
        || err_str.contains("file is encrypted")
        || err_str.contains("database disk image is malformed")
        || err_str.contains("notadb")
        || err_str.contains("authentication failed")
        || err_str.contains("unsupported file format")
        || err_str.contains("unable to open database")
}

/// Apply the SQLCipher pragma sequence to a freshly opened connection.
///
/// Must be called before any other statement on the connection: `PRAGMA key`
/// has to run first, in the order below.
///
/// # Errors
/// Returns [`StorageError::WrongKeyOrNotEncrypted`] if the key is rejected, or
/// [`StorageError::Encryption`] if a pragma fails for another reason.
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    let start = std::time::Instant::now();

    conn.pragma_update(None, "key", config.key.expose()).map_err(|e| {
        let err_str = e.to_string().to_lowercase();
        if is_wrong_key_error(&err_str) {
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::Encryption(format!("failed to set encryption key: {e}"))
        }
    })?;

    conn.pragma_update(None, "cipher_compatibility", config.cipher_compatibility)
        .map_err(|e| StorageError::Encryption(format!("failed to set cipher_compatibility: {e}")))?;

    conn.pragma_update(None, "kdf_iter", config.kdf_iter)
        .map_err(|e| StorageError::Encryption(format!("failed to set kdf_iter: {e}")))?;

    let memory_security = if config.cipher_memory_security { "ON" } else { "OFF" };
    conn.pragma_update(None, "cipher_memory_security", memory_security)
        .map_err(|e| StorageError::Encryption(format!("failed to set cipher_memory_security: {e}")))?;

    debug!(duration_ms = start.elapsed().as_millis(), "sqlcipher configuration applied");
    Ok(())
}

/// Force SQLCipher to actually decrypt a page, surfacing a wrong-key error
/// early instead of on the first real query.
///
/// # Errors
/// Returns [`StorageError::WrongKeyOrNotEncrypted`] if decryption fails.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    let result = conn
        .query_row("PRAGMA user_version", [], |_| Ok::<(), rusqlite::Error>(()))
        .and_then(|()| conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())))
        .map_err(|e| {
            let err_str = e.to_string().to_lowercase();
            if is_wrong_key_error(&err_str) {
                StorageError::WrongKeyOrNotEncrypted
            } else {
                StorageError::from(e)
            }
        });

    if let Err(ref e) = result {
        error!(error = %e, "encryption verification failed");
    }

    result
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn sqlcipher_config_defaults() {
        let config = SqlCipherConfig::new("test_key".to_string());
        assert_eq!(config.cipher_compatibility, 4);
        assert_eq!(config.kdf_iter, 256000);
        assert!(config.cipher_memory_security);
    }

    #[test]
    fn sqlcipher_config_builder() {
        let config = SqlCipherConfig::new("test_key".to_string())
            .with_cipher_compatibility(3)
            .with_kdf_iter(100000)
            .without_memory_security();

        assert_eq!(config.cipher_compatibility, 3);
        assert_eq!(config.kdf_iter, 100000);
        assert!(!config.cipher_memory_security);
    }

    #[test]
    fn configure_and_verify_with_correct_key() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn = Connection::open(&db_path).unwrap();
        let config = SqlCipherConfig::new(
            "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
        );

        configure_sqlcipher(&conn, &config).unwrap();
        verify_encryption(&conn).unwrap();
    }

    #[test]
    fn wrong_encryption_key_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let conn = Connection::open(&db_path).unwrap();
            let config = SqlCipherConfig::new(
                "correct_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            );
            configure_sqlcipher(&conn, &config).unwrap();
            conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)", []).unwrap();
        }

        {
            let conn = Connection::open(&db_path).unwrap();
            let config = SqlCipherConfig::new(
                "wrong_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            );
            configure_sqlcipher(&conn, &config).unwrap();

            let result = verify_encryption(&conn);
            assert!(matches!(result, Err(StorageError::WrongKeyOrNotEncrypted)));
        }
    }
}
