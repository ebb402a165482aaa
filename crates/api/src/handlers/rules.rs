//! `POST /rules/preview`, `POST /rules/apply`

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use chronarc_core::sync::default_initial_window;
use chronarc_domain::types::classification::ClassificationExplanation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub query: String,
    pub project_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub matches: usize,
    pub conflicts: usize,
    pub stats: PreviewStats,
}

#[derive(Debug, Serialize)]
pub struct PreviewStats {
    pub already_correct: usize,
    pub would_change: usize,
    pub sample: Vec<Uuid>,
}

async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let (default_start, default_end) = default_initial_window(chrono::Utc::now());
    let start = req.start_date.unwrap_or(default_start);
    let end = req.end_date.unwrap_or(default_end);

    let outcome = state.classification.preview(state.user_id, &req.query, req.project_id, start, end).await?;

    Ok(Json(PreviewResponse {
        matches: outcome.total_matches,
        conflicts: outcome.manual_conflicts,
        stats: PreviewStats {
            already_correct: outcome.already_correct,
            would_change: outcome.would_change,
            sample: outcome.sample,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub classified: usize,
    pub skipped_applied: usize,
    pub skipped_count: usize,
    pub explanations: Vec<EventExplanationResponse>,
}

#[derive(Debug, Serialize)]
pub struct EventExplanationResponse {
    pub event_id: Uuid,
    #[serde(flatten)]
    pub explanation: ClassificationExplanation,
}

async fn apply(State(state): State<Arc<AppState>>, Json(req): Json<ApplyRequest>) -> ApiResult<impl IntoResponse> {
    let (default_start, default_end) = default_initial_window(chrono::Utc::now());
    let start = req.start_date.unwrap_or(default_start);
    let end = req.end_date.unwrap_or(default_end);

    let outcome =
        state.classification.apply_rules(state.user_id, start, end, req.dry_run.unwrap_or(false)).await?;

    Ok(Json(ApplyResponse {
        classified: outcome.classified,
        skipped_applied: outcome.skipped_applied,
        skipped_count: outcome.skipped_count,
        explanations: outcome
            .explanations
            .into_iter()
            .map(|e| EventExplanationResponse { event_id: e.event_id, explanation: e.explanation })
            .collect(),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/rules/preview", post(preview)).route("/rules/apply", post(apply))
}
