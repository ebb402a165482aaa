//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(String),

    #[error("database encryption error: {0}")]
    Encryption(String),

    #[error("wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("connection timeout after {0}s")]
    Timeout(u64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::Connection("failed to connect".to_string());
        assert_eq!(err.to_string(), "database connection error: failed to connect");

        let err = StorageError::WrongKeyOrNotEncrypted;
        assert_eq!(err.to_string(), "wrong encryption key or database not encrypted");

        let err = StorageError::Timeout(5);
        assert_eq!(err.to_string(), "connection timeout after 5s");
    }
}
