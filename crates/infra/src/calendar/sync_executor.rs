//! Calendar sync executor (§4.3): drives one calendar's sync decision
//! through a provider and persists the result.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chronarc_core::ports::{
    CalendarProvider, CalendarRepository, ConnectionRepository, EventRepository, FetchEventsResult,
    ProviderCredentials, ProviderError,
};
use chronarc_core::sync::planner::{default_initial_window, plan_sync, SyncReason};
use chronarc_domain::constants;
use chronarc_domain::types::calendar::{
    Attendee, Calendar, CalendarConnection, CalendarEvent, ClassificationStatus, ResponseStatus, Transparency,
};
use chronarc_domain::{ChronarcError, Result};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outcome of a single calendar sync pass.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub events_created: usize,
    pub events_updated: usize,
    /// `events_created + events_updated`, kept alongside the split counts
    /// since most internal callers only care about the total.
    pub events_upserted: usize,
    pub events_orphaned: usize,
    pub reason: Option<SyncReason>,
}

pub struct SyncExecutor {
    provider: Arc<dyn CalendarProvider>,
    connections: Arc<dyn ConnectionRepository>,
    calendars: Arc<dyn CalendarRepository>,
    events: Arc<dyn EventRepository>,
}

impl SyncExecutor {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        connections: Arc<dyn ConnectionRepository>,
        calendars: Arc<dyn CalendarRepository>,
        events: Arc<dyn EventRepository>,
    ) -> Self {
        Self { provider, connections, calendars, events }
    }

    /// Sync `calendar_id` against the default initial window (prior N weeks
    /// through next M weeks, relative to now).
    #[instrument(skip(self))]
    pub async fn sync_calendar(&self, calendar_id: Uuid) -> Result<SyncOutcome> {
        let now = Utc::now();
        let (target_start, target_end) = default_initial_window(now);
        self.sync_calendar_range(calendar_id, target_start, target_end).await
    }

    /// Sync `calendar_id` so that `[target_start, target_end]` is covered.
    #[instrument(skip(self))]
    pub async fn sync_calendar_range(
        &self,
        calendar_id: Uuid,
        target_start: NaiveDate,
        target_end: NaiveDate,
    ) -> Result<SyncOutcome> {
        let calendar = self
            .calendars
            .get(calendar_id)
            .await?
            .ok_or_else(|| ChronarcError::not_found(format!("calendar {calendar_id}")))?;

        let now = Utc::now();
        let decision =
            plan_sync(calendar.water_mark(), calendar.last_synced_at, target_start, target_end, now);

        if !decision.needs_sync {
            return Ok(SyncOutcome { reason: Some(decision.reason), ..Default::default() });
        }

        let connection = self
            .connections
            .get(calendar.connection_id)
            .await?
            .ok_or_else(|| ChronarcError::not_found(format!("connection {}", calendar.connection_id)))?;

        let connection = self.ensure_fresh_token(connection).await?;

        let credentials = ProviderCredentials {
            access_token: connection.access_token.clone(),
            refresh_token: connection.refresh_token.clone(),
        };

        let (fetch_min, fetch_max) = match decision.missing_weeks.as_slice() {
            [] => (target_start, target_end),
            weeks => (weeks[0], *weeks.last().unwrap() + chrono::Duration::days(6)),
        };

        let use_incremental = decision.reason == SyncReason::StaleRefresh && calendar.sync_token.is_some();

        let fetch_result = if use_incremental {
            let token = calendar.sync_token.clone().expect("checked above");
            self.provider.fetch_events_incremental(&credentials, &calendar.external_id, &token).await
        } else {
            self.provider.fetch_events(&credentials, &calendar.external_id, fetch_min, fetch_max).await
        };

        let fetch_result = match fetch_result {
            Ok(r) => r,
            Err(ProviderError::SyncTokenInvalidated) => {
                warn!(%calendar_id, "sync token invalidated by provider, falling back to full sync");
                let mut reset = calendar.clone();
                reset.sync_token = None;
                self.calendars.save(&reset).await?;
                return Box::pin(self.sync_calendar_range(calendar_id, target_start, target_end)).await;
            }
            Err(ProviderError::Transient(msg)) => {
                self.record_failure(&calendar).await?;
                return Err(ChronarcError::ProviderTransient(msg));
            }
            Err(ProviderError::Fatal(msg)) => {
                self.connections.mark_all_calendars_needs_reauth(connection.id).await?;
                return Err(ChronarcError::ReauthRequired(msg));
            }
        };

        let outcome = self.apply_fetch_result(&calendar, fetch_min, fetch_max, fetch_result).await?;

        info!(
            %calendar_id,
            events_upserted = outcome.events_upserted,
            events_orphaned = outcome.events_orphaned,
            reason = ?decision.reason,
            "calendar sync completed"
        );

        Ok(SyncOutcome { reason: Some(decision.reason), ..outcome })
    }

    async fn apply_fetch_result(
        &self,
        calendar: &Calendar,
        fetch_min: NaiveDate,
        fetch_max: NaiveDate,
        fetch_result: FetchEventsResult,
    ) -> Result<SyncOutcome> {
        let mut kept_external_ids = Vec::with_capacity(fetch_result.events.len());
        let mut events_created = 0;
        let mut events_updated = 0;

        for provider_event in &fetch_result.events {
            let event = self.to_domain_event(calendar.id, provider_event);
            kept_external_ids.push(event.external_id.clone());
            if self.events.upsert(&event).await? {
                events_created += 1;
            } else {
                events_updated += 1;
            }
        }

        let events_orphaned = if fetch_result.full_sync {
            self.events
                .mark_orphaned_in_range_except(calendar.id, &kept_external_ids, fetch_min, fetch_max)
                .await?
        } else {
            0
        };

        let mut updated = calendar.clone();
        updated.min_synced_date =
            Some(updated.min_synced_date.map_or(fetch_min, |existing| existing.min(fetch_min)));
        updated.max_synced_date =
            Some(updated.max_synced_date.map_or(fetch_max, |existing| existing.max(fetch_max)));
        updated.sync_token = fetch_result.next_sync_token.or(updated.sync_token);
        updated.last_synced_at = Some(Utc::now());
        updated.sync_failure_count = 0;
        updated.needs_reauth = false;
        self.calendars.save(&updated).await?;

        Ok(SyncOutcome {
            events_created,
            events_updated,
            events_upserted: events_created + events_updated,
            events_orphaned,
            reason: None,
        })
    }

    /// Refreshes `connection`'s access token if it's within the refresh
    /// skew window, persisting and returning the updated connection.
    /// Otherwise returns `connection` unchanged.
    async fn ensure_fresh_token(&self, connection: CalendarConnection) -> Result<CalendarConnection> {
        if !connection.needs_token_refresh(Utc::now(), constants::token_refresh_skew()) {
            return Ok(connection);
        }

        debug!(connection_id = %connection.id, "access token near expiry, refreshing");
        let refreshed = self.provider.refresh_token(&connection.refresh_token).await?;

        let mut updated = connection;
        updated.access_token = refreshed.access_token;
        updated.refresh_token = refreshed.refresh_token;
        updated.token_expires_at = Utc::now() + chrono::Duration::seconds(refreshed.expires_in_secs);
        self.connections.save(&updated).await?;
        Ok(updated)
    }

    async fn record_failure(&self, calendar: &Calendar) -> Result<()> {
        let mut updated = calendar.clone();
        updated.sync_failure_count += 1;
        if updated.sync_failure_count >= constants::BACKGROUND_MAX_FAILURES {
            debug!(calendar_id = %calendar.id, "calendar quarantined after repeated sync failures");
        }
        self.calendars.save(&updated).await
    }

    fn to_domain_event(
        &self,
        calendar_id: Uuid,
        provider_event: &chronarc_core::ports::ProviderEvent,
    ) -> CalendarEvent {
        let attendees = provider_event
            .attendees
            .iter()
            .map(|a| Attendee {
                email: a.email.clone(),
                is_self: a.is_self,
                response_status: ResponseStatus::from_str(&a.response_status)
                    .unwrap_or(ResponseStatus::NeedsAction),
            })
            .collect();

        CalendarEvent {
            id: Uuid::now_v7(),
            calendar_id,
            external_id: provider_event.id.clone(),
            title: provider_event.summary.clone(),
            description: provider_event.description.clone(),
            start: provider_event.start,
            end: provider_event.end,
            attendees,
            is_recurring: provider_event.recurring_event_id.is_some(),
            response_status: ResponseStatus::NeedsAction,
            transparency: Transparency::from_str(&provider_event.transparency)
                .unwrap_or(Transparency::Opaque),
            is_orphaned: provider_event.status.eq_ignore_ascii_case("cancelled"),
            is_suppressed: false,
            classification_status: ClassificationStatus::Pending,
            is_skipped: false,
            needs_review: false,
            project_id: None,
            classification_source: None,
            classification_confidence: None,
        }
    }
}
