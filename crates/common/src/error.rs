//! Crate-wide error type for cross-cutting utilities.

use thiserror::Error;

/// Error produced by the storage, crypto, or resilience helpers in this crate.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CommonError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }
}

pub type CommonResult<T> = Result<T, CommonError>;
