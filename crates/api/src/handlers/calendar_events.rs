//! `GET /calendar-events`, `PUT /calendar-events/{id}/classify`,
//! `POST /calendar-events/bulk-classify`

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use chronarc_core::sync::plan_sync;
use chronarc_domain::types::calendar::{CalendarEvent, ClassificationStatus};
use chronarc_domain::types::time_entry::TimeEntry;
use chronarc_domain::ChronarcError;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub classification_status: Option<String>,
    pub connection_id: Option<Uuid>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .classification_status
        .as_deref()
        .map(ClassificationStatus::from_str)
        .transpose()
        .map_err(|_| ChronarcError::invalid_request("unrecognised classification_status"))?;

    // Only the `connection_id`-scoped case can resolve which calendars (and
    // therefore which provider executor) to sync on demand; without it we
    // serve directly from the store.
    if let Some(connection_id) = query.connection_id {
        sync_stale_calendars(&state, connection_id, query.start_date, query.end_date).await;
    }

    let events = state
        .events
        .list(state.user_id, query.start_date, query.end_date, status, query.connection_id)
        .await?;

    Ok(Json(events))
}

async fn sync_stale_calendars(
    state: &AppState,
    connection_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) {
    let Ok(connection) = state.connections.get(connection_id).await else { return };
    let Some(connection) = connection else { return };
    let Some(executor) = state.executor_for(&connection.provider) else { return };

    let Ok(calendars) = state.calendars.list_for_connection(connection_id).await else { return };
    for calendar in calendars {
        let decision = plan_sync(calendar.water_mark(), calendar.last_synced_at, start, end, chrono::Utc::now());
        if !decision.needs_sync {
            continue;
        }
        if let Err(err) = executor.sync_calendar_range(calendar.id, start, end).await {
            warn!(calendar_id = %calendar.id, error = ?err, "on-demand sync failed, serving stale data");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub project_id: Option<Uuid>,
    pub skip: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub event: CalendarEvent,
    pub time_entry: Option<TimeEntry>,
}

async fn classify_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<ClassifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let skip = req.skip.unwrap_or(false);
    let event = state.events.classify(state.user_id, event_id, req.project_id, skip).await?;

    let time_entry = match event.project_id {
        Some(project_id) if !skip => {
            let day_events =
                state.events.get_by_project_and_date(state.user_id, project_id, event.start.date_naive()).await?;
            chronarc_core::time_entries::compute_entry(&day_events, project_id, event.start.date_naive()).map(
                |computed| TimeEntry {
                    id: Uuid::nil(),
                    user_id: state.user_id,
                    project_id: computed.project_id,
                    date: computed.date,
                    hours: computed.hours,
                    title: computed.title,
                    description: computed.description,
                    contributing_events: computed.contributing_events,
                    materialised: None,
                    is_pinned: false,
                    is_locked: false,
                    invoice_id: None,
                },
            )
        }
        _ => None,
    };

    Ok(Json(ClassifyResponse { event, time_entry }))
}

#[derive(Debug, Deserialize)]
pub struct BulkClassifyRequest {
    pub query: String,
    pub project_id: Option<Uuid>,
    pub skip: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BulkClassifyResponse {
    pub classified_count: usize,
    pub skipped_count: usize,
}

async fn bulk_classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkClassifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .classification
        .bulk_classify(state.user_id, &req.query, req.project_id, req.skip.unwrap_or(false))
        .await?;

    Ok(Json(BulkClassifyResponse {
        classified_count: outcome.classified_count,
        skipped_count: outcome.skipped_count,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar-events", get(list_events))
        .route("/calendar-events/{id}/classify", put(classify_event))
        .route("/calendar-events/bulk-classify", post(bulk_classify))
}
