//! `GET /time-entries`, `POST /time-entries/{id}/refresh`

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub project_id: Option<Uuid>,
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEntriesQuery>,
) -> ApiResult<impl IntoResponse> {
    let entries = state
        .time_entries
        .list_range(state.user_id, query.start_date, query.end_date, query.project_id)
        .await?;
    Ok(Json(entries))
}

async fn refresh_entry(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let entry = state.time_entries.refresh(state.user_id, entry_id).await?;
    Ok(Json(entry))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/time-entries", get(list_entries))
        .route("/time-entries/{id}/refresh", post(refresh_entry))
}
