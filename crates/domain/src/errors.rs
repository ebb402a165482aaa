//! Error types used throughout the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Chronarc, carried across crate boundaries and
/// serialised directly into the `{code, message}` HTTP error body.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "code", content = "message")]
#[serde(rename_all = "snake_case")]
pub enum ChronarcError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("reauthorization required: {0}")]
    ReauthRequired(String),

    #[error("oauth error: {0}")]
    OauthError(String),

    #[error("provider error (transient): {0}")]
    ProviderTransient(String),

    #[error("provider error (fatal): {0}")]
    ProviderFatal(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChronarcError {
    #[must_use]
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    /// HTTP status code this error kind maps onto.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) | Self::ReauthRequired(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::InvalidRequest(_) | Self::InvalidQuery(_) | Self::OauthError(_) => 400,
            Self::ProviderTransient(_) => 503,
            Self::ProviderFatal(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for ChronarcError {
    fn from(value: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => Self::Internal("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => Self::Internal("database is locked".into()),
                    (ErrorCode::ConstraintViolation, 2067) => {
                        Self::conflict("unique constraint violation")
                    }
                    _ if looks_like_wrong_key(&message) => {
                        Self::Internal("SQLCipher key rejected or database not encrypted".into())
                    }
                    _ => Self::Internal(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => Self::not_found("row"),
            other => Self::Internal(other.to_string()),
        }
    }
}

fn looks_like_wrong_key(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("not a database") || lower.contains("encrypted")
}

/// Result type alias for Chronarc operations.
pub type Result<T> = std::result::Result<T, ChronarcError>;
