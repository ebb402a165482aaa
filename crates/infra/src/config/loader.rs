//! Configuration loader.
//!
//! ## Loading Strategy
//! 1. Start from [`Config::default`].
//! 2. Overlay any `CHRONARC_*` environment variables that are present.
//! 3. If no environment variables are present at all, fall back to probing
//!    for a config file and merging it the same way.
//!
//! ## Environment Variables
//! - `CHRONARC_DATABASE_PATH`, `CHRONARC_DATABASE_ENCRYPTION_KEY`,
//!   `CHRONARC_DATABASE_POOL_SIZE`, `CHRONARC_DATABASE_CALL_TIMEOUT_SECS`
//! - `CHRONARC_PROVIDER_TIMEOUT_SECS`, `CHRONARC_PROVIDER_CLIENT_ID`,
//!   `CHRONARC_PROVIDER_CLIENT_SECRET`, `CHRONARC_PROVIDER_REDIRECT_URI`,
//!   `CHRONARC_PROVIDER_TOKEN_REFRESH_SKEW_MINUTES`,
//!   `CHRONARC_PROVIDER_CREDENTIAL_ENCRYPTION_KEY`
//! - `CHRONARC_SCHEDULER_INTERVAL_SECS`, `CHRONARC_SCHEDULER_MAX_FAILURES`,
//!   `CHRONARC_SCHEDULER_STALENESS_HOURS`,
//!   `CHRONARC_SCHEDULER_WINDOW_WEEKS_BEFORE`,
//!   `CHRONARC_SCHEDULER_WINDOW_WEEKS_AFTER`
//! - `CHRONARC_CLASSIFICATION_SKIP_THRESHOLD`,
//!   `CHRONARC_CLASSIFICATION_PROJECT_THRESHOLD`,
//!   `CHRONARC_CLASSIFICATION_REVIEW_THRESHOLD`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./chronarc.json` or `./chronarc.toml`
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chronarc_domain::{ChronarcError, Config, Result};

/// Load configuration, preferring environment variables and falling back to
/// a config file when none are set.
///
/// # Errors
/// Returns an error if a present environment variable or config file field
/// fails to parse.
pub fn load() -> Result<Config> {
    if has_any_env_var() {
        tracing::info!("configuration loaded from environment variables");
        return load_from_env();
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("no CHRONARC_* environment variables or config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Build a [`Config`] from `CHRONARC_*` environment variables, starting from
/// [`Config::default`] and overlaying whichever variables are set.
///
/// # Errors
/// Returns an error if a present variable fails to parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    if let Some(v) = env_var("CHRONARC_DATABASE_PATH") {
        config.database.path = v;
    }
    if let Some(v) = env_var("CHRONARC_DATABASE_ENCRYPTION_KEY") {
        config.database.encryption_key = v;
    }
    overlay_parsed("CHRONARC_DATABASE_POOL_SIZE", &mut config.database.pool_size)?;
    overlay_parsed("CHRONARC_DATABASE_CALL_TIMEOUT_SECS", &mut config.database.call_timeout_secs)?;

    overlay_parsed("CHRONARC_PROVIDER_TIMEOUT_SECS", &mut config.provider.timeout_secs)?;
    overlay_parsed(
        "CHRONARC_PROVIDER_TOKEN_REFRESH_SKEW_MINUTES",
        &mut config.provider.token_refresh_skew_minutes,
    )?;
    if let Some(v) = env_var("CHRONARC_PROVIDER_CLIENT_ID") {
        config.provider.client_id = v;
    }
    if let Some(v) = env_var("CHRONARC_PROVIDER_CLIENT_SECRET") {
        config.provider.client_secret = v;
    }
    if let Some(v) = env_var("CHRONARC_PROVIDER_REDIRECT_URI") {
        config.provider.redirect_uri = v;
    }
    if let Some(v) = env_var("CHRONARC_PROVIDER_CREDENTIAL_ENCRYPTION_KEY") {
        config.provider.credential_encryption_key = v;
    }

    overlay_parsed("CHRONARC_SCHEDULER_INTERVAL_SECS", &mut config.scheduler.interval_secs)?;
    overlay_parsed("CHRONARC_SCHEDULER_MAX_FAILURES", &mut config.scheduler.max_failures)?;
    overlay_parsed("CHRONARC_SCHEDULER_STALENESS_HOURS", &mut config.scheduler.staleness_hours)?;
    overlay_parsed(
        "CHRONARC_SCHEDULER_WINDOW_WEEKS_BEFORE",
        &mut config.scheduler.default_window_weeks_before,
    )?;
    overlay_parsed(
        "CHRONARC_SCHEDULER_WINDOW_WEEKS_AFTER",
        &mut config.scheduler.default_window_weeks_after,
    )?;

    overlay_parsed(
        "CHRONARC_CLASSIFICATION_SKIP_THRESHOLD",
        &mut config.classification.skip_threshold,
    )?;
    overlay_parsed(
        "CHRONARC_CLASSIFICATION_PROJECT_THRESHOLD",
        &mut config.classification.project_threshold,
    )?;
    overlay_parsed(
        "CHRONARC_CLASSIFICATION_REVIEW_THRESHOLD",
        &mut config.classification.review_threshold,
    )?;

    Ok(config)
}

/// Load configuration from a file, merging onto [`Config::default`].
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns an error if the file is missing, unreadable, or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ChronarcError::invalid_request(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ChronarcError::invalid_request("no config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        ChronarcError::invalid_request(format!("failed to read config file: {e}"))
    })?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ChronarcError::invalid_request(format!("invalid TOML config: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ChronarcError::invalid_request(format!("invalid JSON config: {e}"))),
        other => Err(ChronarcError::invalid_request(format!("unsupported config format: {other}"))),
    }
}

/// Probe standard locations for a config file.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("chronarc.json"),
            cwd.join("chronarc.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend([
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("chronarc.json"),
                exe_dir.join("chronarc.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn overlay_parsed<T: FromStr>(key: &str, target: &mut T) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_var(key) {
        *target = raw
            .parse()
            .map_err(|e| ChronarcError::invalid_request(format!("invalid value for {key}: {e}")))?;
    }
    Ok(())
}

fn has_any_env_var() -> bool {
    const KEYS: &[&str] = &[
        "CHRONARC_DATABASE_PATH",
        "CHRONARC_DATABASE_ENCRYPTION_KEY",
        "CHRONARC_DATABASE_POOL_SIZE",
        "CHRONARC_PROVIDER_CLIENT_ID",
        "CHRONARC_PROVIDER_CLIENT_SECRET",
        "CHRONARC_SCHEDULER_INTERVAL_SECS",
    ];
    KEYS.iter().any(|k| std::env::var(k).is_ok())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn load_from_env_overlays_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::set_var("CHRONARC_DATABASE_PATH", "/tmp/chronarc-test.db");
        std::env::set_var("CHRONARC_DATABASE_POOL_SIZE", "4");

        let config = load_from_env().expect("env config should parse");
        assert_eq!(config.database.path, "/tmp/chronarc-test.db");
        assert_eq!(config.database.pool_size, 4);
        // Untouched fields keep their defaults.
        assert_eq!(config.classification.skip_threshold, Config::default().classification.skip_threshold);

        std::env::remove_var("CHRONARC_DATABASE_PATH");
        std::env::remove_var("CHRONARC_DATABASE_POOL_SIZE");
    }

    #[test]
    fn load_from_env_rejects_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::set_var("CHRONARC_DATABASE_POOL_SIZE", "not-a-number");

        let result = load_from_env();
        assert!(result.is_err());

        std::env::remove_var("CHRONARC_DATABASE_POOL_SIZE");
    }

    #[test]
    fn load_from_file_toml_merges_onto_defaults() {
        let toml_content = r#"
[database]
path = "test.db"
encryption_key = "deadbeef"
pool_size = 6
call_timeout_secs = 5
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_ok(), "should load config from TOML file: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, 6);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_missing_path_errors() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/chronarc-config.toml")));
        assert!(result.is_err());
    }
}
