//! Storage primitives for SQLCipher-encrypted databases.

pub mod error;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use sqlcipher::{
    apply_connection_pragmas, configure_sqlcipher, verify_encryption, PooledConnection,
    SqlCipherConfig, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig,
};
