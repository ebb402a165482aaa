//! `POST /calendars/{id}/sync`

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use chronarc_domain::ChronarcError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub events_created: usize,
    pub events_updated: usize,
    pub events_orphaned: usize,
}

async fn sync_calendar(
    State(state): State<Arc<AppState>>,
    Path(calendar_id): Path<Uuid>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<impl IntoResponse> {
    let calendar = state
        .calendars
        .get(calendar_id)
        .await?
        .ok_or_else(|| ChronarcError::not_found(format!("calendar {calendar_id}")))?;

    let connection = state
        .connections
        .get(calendar.connection_id)
        .await?
        .ok_or_else(|| ChronarcError::not_found(format!("connection {}", calendar.connection_id)))?;

    let executor = state.executor_for(&connection.provider).ok_or_else(|| {
        ChronarcError::Internal(format!("no sync executor configured for provider '{}'", connection.provider))
    })?;

    let outcome = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => executor.sync_calendar_range(calendar_id, start, end).await?,
        _ => executor.sync_calendar(calendar_id).await?,
    };

    Ok(Json(SyncResponse {
        events_created: outcome.events_created,
        events_updated: outcome.events_updated,
        events_orphaned: outcome.events_orphaned,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/calendars/{id}/sync", post(sync_calendar))
}
