//! Shared retry configuration for provider HTTP calls.

use std::time::Duration;

use chronarc_common::resilience::retry::{BackoffStrategy, Jitter, RetryConfig};

/// Retries transient provider errors a handful of times with exponential
/// backoff, capped well under typical request timeouts.
pub fn provider_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 4,
        backoff: BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(200),
            base: 2.0,
            max_delay: Duration::from_secs(5),
        },
        jitter: Jitter::Equal,
        max_total_time: Some(Duration::from_secs(30)),
        reset_on_success: false,
    }
}
