//! End-to-end tests driving the axum router in-process via `oneshot`,
//! against an in-memory SQLCipher store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chronarc_api::{build_app, AppState};
use chronarc_common::EncryptionService;
use chronarc_infra::db::{
    SqliteCalendarRepository, SqliteConnectionRepository, SqliteEventRepository,
    SqliteProjectRepository, SqliteRuleRepository, SqliteTimeEntryRepository,
};
use chronarc_infra::DbPool;
use tower::ServiceExt;
use uuid::Uuid;

fn test_state() -> AppState {
    let db = DbPool::open_in_memory().expect("in-memory db should open");
    let encryption = Arc::new(EncryptionService::new(&EncryptionService::generate_key()).expect("valid key"));

    let connections = Arc::new(SqliteConnectionRepository::new(db.clone(), encryption));
    let calendars = Arc::new(SqliteCalendarRepository::new(db.clone()));
    let events = Arc::new(SqliteEventRepository::new(db.clone()));
    let entries = Arc::new(SqliteTimeEntryRepository::new(db.clone()));
    let projects = Arc::new(SqliteProjectRepository::new(db.clone()));
    let rules = Arc::new(SqliteRuleRepository::new(db));

    AppState::new(connections, calendars, events, entries, projects, rules, HashMap::new(), Uuid::nil())
}

#[tokio::test]
async fn list_time_entries_on_empty_store_returns_empty_array() {
    let app = build_app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/time-entries?start_date=2026-01-01&end_date=2026-01-31")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&body).expect("valid json");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn preview_rules_on_empty_store_reports_no_matches() {
    let app = build_app(test_state());

    let body = serde_json::json!({ "query": "title:standup" }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rules/preview")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("valid json");
    assert_eq!(json["matches"], 0);
}

#[tokio::test]
async fn sync_unknown_calendar_returns_not_found() {
    let app = build_app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/calendars/{}/sync", Uuid::new_v4()))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classify_unknown_event_returns_not_found() {
    let app = build_app(test_state());

    let body = serde_json::json!({ "skip": true }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/calendar-events/{}/classify", Uuid::new_v4()))
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_classify_rejects_missing_project_and_skip() {
    let app = build_app(test_state());

    let body = serde_json::json!({ "query": "title:standup" }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calendar-events/bulk-classify")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
