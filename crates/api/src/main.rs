//! Chronarc API — entry point.
//!
//! Loads configuration (environment variables, falling back to a config
//! file; see `chronarc_infra::config::load`), opens the SQLCipher-backed
//! store, wires the repositories/services/providers together into an
//! [`chronarc_api::AppState`], and serves the HTTP surface.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CHRONARC_API_ADDR` | `127.0.0.1:4317` | Address to bind the HTTP listener to. |
//! | `CHRONARC_LOG_FORMAT` | `text` | `text` or `json` tracing output. |
//!
//! All other configuration (database path/key, provider credentials,
//! scheduler cadence, classifier thresholds) is read via
//! `chronarc_infra::config::load`, documented on that module.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chronarc_common::EncryptionService;
use chronarc_infra::db::{
    SqliteCalendarRepository, SqliteConnectionRepository, SqliteEventRepository,
    SqliteProjectRepository, SqliteRuleRepository, SqliteSyncJobRepository, SqliteTimeEntryRepository,
};
use chronarc_infra::{DbPool, GoogleCalendarProvider, MicrosoftCalendarProvider, SyncExecutor, SyncScheduler, SyncSchedulerConfig};
use chronarc_api::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// This service issues no session tokens of its own; every request acts as
/// this single local user.
const LOCAL_USER_ID: Uuid = Uuid::nil();

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("chronarc-api failed to start: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chronarc_api=info,chronarc_infra=info,chronarc_core=info"));

    match std::env::var("CHRONARC_LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = chronarc_infra::config::load()?;

    let db = DbPool::open(
        Path::new(&config.database.path),
        config.database.encryption_key.clone(),
        config.database.pool_size,
    )?;

    let credential_key = BASE64.decode(config.provider.credential_encryption_key.as_bytes())
        .map_err(|e| format!("CHRONARC_PROVIDER_CREDENTIAL_ENCRYPTION_KEY is not valid base64: {e}"))?;
    let encryption = Arc::new(EncryptionService::new(&credential_key)?);

    let connections = Arc::new(SqliteConnectionRepository::new(db.clone(), encryption));
    let calendars = Arc::new(SqliteCalendarRepository::new(db.clone()));
    let events = Arc::new(SqliteEventRepository::new(db.clone()));
    let entries = Arc::new(SqliteTimeEntryRepository::new(db.clone()));
    let projects = Arc::new(SqliteProjectRepository::new(db.clone()));
    let rules = Arc::new(SqliteRuleRepository::new(db.clone()));
    let sync_jobs = Arc::new(SqliteSyncJobRepository::new(db));

    let mut executors: HashMap<String, Arc<SyncExecutor>> = HashMap::new();

    if !config.provider.client_id.is_empty() {
        let google = GoogleCalendarProvider::new(
            config.provider.client_id.clone(),
            config.provider.client_secret.clone(),
            &config.provider.redirect_uri,
        )?;
        executors.insert(
            "google".to_string(),
            Arc::new(SyncExecutor::new(Arc::new(google), connections.clone(), calendars.clone(), events.clone())),
        );

        let microsoft = MicrosoftCalendarProvider::new(
            config.provider.client_id.clone(),
            config.provider.client_secret.clone(),
            &config.provider.redirect_uri,
        )?;
        executors.insert(
            "microsoft".to_string(),
            Arc::new(SyncExecutor::new(Arc::new(microsoft), connections.clone(), calendars.clone(), events.clone())),
        );
    } else {
        warn!("no provider OAuth client configured, calendar sync is disabled until credentials are set");
    }

    // The background scheduler binds to a single `SyncExecutor`; with more
    // than one provider configured we can't safely guess which one owns a
    // given stale calendar, so background sync stays on-demand-only in that
    // case (the same scoping limitation `GET /calendar-events` already
    // documents for its sync-on-read path).
    let mut scheduler_handle = match executors.len() {
        1 => executors.values().next().cloned().map(|executor| {
            let scheduler_config = SyncSchedulerConfig {
                cron_expression: format!("0 */{} * * * *", (config.scheduler.interval_secs / 60).max(1)),
                staleness: chrono::Duration::hours(config.scheduler.staleness_hours),
                max_failures: config.scheduler.max_failures,
                max_gap_fill_jobs_per_tick: config.scheduler.max_gap_fill_jobs_per_tick,
            };
            SyncScheduler::new(scheduler_config, executor, calendars.clone(), sync_jobs.clone())
        }),
        0 => None,
        _ => {
            warn!("multiple calendar providers configured, background sync scheduler disabled");
            None
        }
    };

    if let Some(scheduler) = scheduler_handle.as_mut() {
        scheduler.start().await?;
        info!("background sync scheduler started");
    }

    let state = AppState::new(connections, calendars, events, entries, projects, rules, executors, LOCAL_USER_ID);

    let addr = std::env::var("CHRONARC_API_ADDR").unwrap_or_else(|_| "127.0.0.1:4317".to_string());
    let result = chronarc_api::start(state, &addr).await;

    if let Some(scheduler) = scheduler_handle.as_mut() {
        scheduler.stop().await.ok();
    }

    result.map_err(Into::into)
}
