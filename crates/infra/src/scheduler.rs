//! Background sync scheduler (§4.5): periodically syncs every stale
//! calendar via [`crate::calendar::SyncExecutor`].
//!
//! Follows the teacher's scheduler lifecycle shape: an explicit
//! start/stop with a cancellation token and a monitor task, rather than a
//! bare `tokio::spawn` loop with no shutdown path.

use std::sync::Arc;
use std::time::Duration;

use chronarc_core::ports::{CalendarRepository, SyncJobRepository};
use chronarc_domain::constants;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::calendar::SyncExecutor;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,
    #[error("scheduler not running")]
    NotRunning,
    #[error("failed to create job scheduler: {0}")]
    CreationFailed(#[source] tokio_cron_scheduler::JobSchedulerError),
    #[error("failed to register sync job: {0}")]
    JobRegistrationFailed(#[source] tokio_cron_scheduler::JobSchedulerError),
    #[error("failed to start job scheduler: {0}")]
    StartFailed(#[source] tokio_cron_scheduler::JobSchedulerError),
    #[error("failed to stop job scheduler: {0}")]
    StopFailed(#[source] tokio_cron_scheduler::JobSchedulerError),
    #[error("monitor task panicked: {0}")]
    MonitorJoinFailed(#[source] tokio::task::JoinError),
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Seconds-granularity cron expression (tokio-cron-scheduler's 7-field
    /// format, seconds first).
    pub cron_expression: String,
    pub staleness: chrono::Duration,
    pub max_failures: u32,
    pub max_gap_fill_jobs_per_tick: usize,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: format!("0 */{} * * * *", constants::BACKGROUND_SYNC_INTERVAL_SECS / 60),
            staleness: constants::staleness(),
            max_failures: constants::BACKGROUND_MAX_FAILURES,
            max_gap_fill_jobs_per_tick: constants::MAX_GAP_FILL_JOBS_PER_TICK,
        }
    }
}

/// Drives [`SyncExecutor`] for every stale, syncable calendar on a cron
/// schedule.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    executor: Arc<SyncExecutor>,
    calendars: Arc<dyn CalendarRepository>,
    jobs: Arc<dyn SyncJobRepository>,
}

impl SyncScheduler {
    #[must_use]
    pub fn new(
        config: SyncSchedulerConfig,
        executor: Arc<SyncExecutor>,
        calendars: Arc<dyn CalendarRepository>,
        jobs: Arc<dyn SyncJobRepository>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            executor,
            calendars,
            jobs,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        let scheduler = self.build_scheduler().await?;
        scheduler.start().await.map_err(SchedulerError::StartFailed)?;
        self.scheduler = Some(scheduler);

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("sync scheduler monitor task exiting");
        }));

        info!(cron = %self.config.cron_expression, "sync scheduler started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let mut scheduler = self.scheduler.take().ok_or(SchedulerError::NotRunning)?;
        self.cancellation.cancel();

        scheduler.shutdown().await.map_err(SchedulerError::StopFailed)?;

        if let Some(handle) = self.monitor_handle.take() {
            handle.await.map_err(SchedulerError::MonitorJoinFailed)?;
        }

        info!("sync scheduler stopped");
        Ok(())
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new().await.map_err(SchedulerError::CreationFailed)?;

        let executor = self.executor.clone();
        let calendars = self.calendars.clone();
        let jobs = self.jobs.clone();
        let staleness = self.config.staleness;
        let max_failures = self.config.max_failures;
        let max_gap_fill_jobs = self.config.max_gap_fill_jobs_per_tick;

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let executor = executor.clone();
            let calendars = calendars.clone();
            let jobs = jobs.clone();

            Box::pin(async move {
                run_tick(executor, calendars, jobs, staleness, max_failures, max_gap_fill_jobs).await;
            })
        })
        .map_err(SchedulerError::JobRegistrationFailed)?;

        scheduler.add(job).await.map_err(SchedulerError::JobRegistrationFailed)?;
        Ok(scheduler)
    }
}

async fn run_tick(
    executor: Arc<SyncExecutor>,
    calendars: Arc<dyn CalendarRepository>,
    jobs: Arc<dyn SyncJobRepository>,
    staleness: chrono::Duration,
    max_failures: u32,
    max_gap_fill_jobs: usize,
) {
    let (synced, failed) = sync_stale_calendars(&executor, calendars.as_ref(), staleness, max_failures).await;
    let (gap_filled, gap_fill_failed) = drain_gap_fill_jobs(&executor, jobs.as_ref(), max_gap_fill_jobs).await;

    info!(synced, failed, gap_filled, gap_fill_failed, "sync tick completed");
}

async fn sync_stale_calendars(
    executor: &SyncExecutor,
    calendars: &dyn CalendarRepository,
    staleness: chrono::Duration,
    max_failures: u32,
) -> (usize, usize) {
    let stale = match calendars.list_stale(staleness, max_failures).await {
        Ok(list) => list,
        Err(err) => {
            error!(error = ?err, "failed to list stale calendars, skipping tick");
            return (0, 0);
        }
    };

    if stale.is_empty() {
        debug!("no stale calendars this tick");
        return (0, 0);
    }

    let mut synced = 0;
    let mut failed = 0;
    for calendar in stale {
        match tokio::time::timeout(
            Duration::from_secs(constants::DATABASE_TIMEOUT_SECS + constants::PROVIDER_TIMEOUT_SECS),
            executor.sync_calendar(calendar.id),
        )
        .await
        {
            Ok(Ok(outcome)) => {
                synced += 1;
                debug!(calendar_id = %calendar.id, events_upserted = outcome.events_upserted, "calendar synced");
            }
            Ok(Err(err)) => {
                failed += 1;
                warn!(calendar_id = %calendar.id, error = ?err, "calendar sync failed");
            }
            Err(_) => {
                failed += 1;
                warn!(calendar_id = %calendar.id, "calendar sync timed out");
            }
        }
    }

    (synced, failed)
}

/// Drains up to `max_gap_fill_jobs` queued [`chronarc_domain::types::calendar::SyncJob`]s,
/// expanding each job's calendar to cover `[target_min_date, target_max_date]`.
async fn drain_gap_fill_jobs(
    executor: &SyncExecutor,
    jobs: &dyn SyncJobRepository,
    max_gap_fill_jobs: usize,
) -> (usize, usize) {
    let batch = match jobs.dequeue_batch(max_gap_fill_jobs).await {
        Ok(batch) => batch,
        Err(err) => {
            error!(error = ?err, "failed to dequeue gap-fill jobs, skipping this tick's drain");
            return (0, 0);
        }
    };

    if batch.is_empty() {
        debug!("no queued gap-fill jobs this tick");
        return (0, 0);
    }

    let mut filled = 0;
    let mut failed = 0;
    for job in batch {
        match tokio::time::timeout(
            Duration::from_secs(constants::DATABASE_TIMEOUT_SECS + constants::PROVIDER_TIMEOUT_SECS),
            executor.sync_calendar_range(job.calendar_id, job.target_min_date, job.target_max_date),
        )
        .await
        {
            Ok(Ok(outcome)) => {
                filled += 1;
                debug!(
                    calendar_id = %job.calendar_id,
                    events_upserted = outcome.events_upserted,
                    "gap-fill job completed"
                );
            }
            Ok(Err(err)) => {
                failed += 1;
                warn!(calendar_id = %job.calendar_id, error = ?err, "gap-fill job failed");
            }
            Err(_) => {
                failed += 1;
                warn!(calendar_id = %job.calendar_id, "gap-fill job timed out");
            }
        }
    }

    (filled, failed)
}
