//! Retry logic for transient provider and database failures.
//!
//! Generic over the error type, with configurable backoff and jitter
//! strategies. Used by the calendar provider adapters to retry rate-limited
//! or transiently-failing HTTP calls.

pub mod retry;

pub use retry::{
    policies, retry, retry_with_policy, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryContext, RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
