//! Application configuration structures.
//!
//! Values here mirror the constants in [`crate::constants`]; the defaults
//! implemented on each section match those constants so that a missing
//! environment variable or config file falls back to documented behaviour.

use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

/// SQLCipher database location and encryption key material.
///
/// `CHRONARC_DATABASE_PATH`, `CHRONARC_DATABASE_ENCRYPTION_KEY`,
/// `CHRONARC_DATABASE_POOL_SIZE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    /// Hex-encoded SQLCipher key. Not logged; never `Debug`-printed in full
    /// by any caller outside this struct's own derive.
    pub encryption_key: String,
    pub pool_size: u32,
    pub call_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "chronarc.sqlite3".to_string(),
            encryption_key: String::new(),
            pool_size: 8,
            call_timeout_secs: constants::DATABASE_TIMEOUT_SECS,
        }
    }
}

/// Remote calendar provider network settings.
///
/// `CHRONARC_PROVIDER_TIMEOUT_SECS`, `CHRONARC_PROVIDER_CLIENT_ID`,
/// `CHRONARC_PROVIDER_CLIENT_SECRET`, `CHRONARC_PROVIDER_REDIRECT_URI`,
/// `CHRONARC_PROVIDER_CREDENTIAL_ENCRYPTION_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub token_refresh_skew_minutes: i64,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Base64-encoded 32-byte AES-256-GCM key used to encrypt stored OAuth
    /// access/refresh tokens. Not logged; never `Debug`-printed in full.
    pub credential_encryption_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: constants::PROVIDER_TIMEOUT_SECS,
            token_refresh_skew_minutes: constants::TOKEN_REFRESH_SKEW_MINUTES,
            client_id: String::new(),
            client_secret: String::new(),
            credential_encryption_key: String::new(),
            redirect_uri: "http://127.0.0.1:0/oauth/callback".to_string(),
        }
    }
}

/// Background sync scheduler cadence and window sizing.
///
/// `CHRONARC_SCHEDULER_INTERVAL_SECS`, `CHRONARC_SCHEDULER_MAX_FAILURES`,
/// `CHRONARC_SCHEDULER_WINDOW_WEEKS_BEFORE`,
/// `CHRONARC_SCHEDULER_WINDOW_WEEKS_AFTER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub max_failures: u32,
    pub staleness_hours: i64,
    pub default_window_weeks_before: i64,
    pub default_window_weeks_after: i64,
    pub max_gap_fill_jobs_per_tick: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: constants::BACKGROUND_SYNC_INTERVAL_SECS,
            max_failures: constants::BACKGROUND_MAX_FAILURES,
            staleness_hours: constants::STALENESS_HOURS,
            default_window_weeks_before: constants::DEFAULT_INITIAL_WINDOW_WEEKS_BEFORE,
            default_window_weeks_after: constants::DEFAULT_INITIAL_WINDOW_WEEKS_AFTER,
            max_gap_fill_jobs_per_tick: constants::MAX_GAP_FILL_JOBS_PER_TICK,
        }
    }
}

/// Classifier thresholds.
///
/// `CHRONARC_CLASSIFICATION_SKIP_THRESHOLD`,
/// `CHRONARC_CLASSIFICATION_PROJECT_THRESHOLD`,
/// `CHRONARC_CLASSIFICATION_REVIEW_THRESHOLD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub skip_threshold: f64,
    pub project_threshold: f64,
    pub review_threshold: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            skip_threshold: constants::SKIP_THRESHOLD,
            project_threshold: constants::PROJECT_THRESHOLD,
            review_threshold: constants::REVIEW_THRESHOLD,
        }
    }
}
