//! Cross-cutting utilities shared across the Chronarc crates: error envelope
//! helpers, the SQLCipher pool/pragma wrapper, OAuth credential encryption,
//! and retry/backoff for transient provider failures.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod crypto;
pub mod error;
pub mod resilience;
pub mod security;
pub mod storage;

pub use crypto::{EncryptedData, EncryptionService};
pub use error::{CommonError, CommonResult};
pub use resilience::{
    retry, retry_with_policy, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryPolicy, RetryResult,
};
pub use security::{generate_encryption_key, SecureString};
pub use storage::{StorageError, StorageResult};
