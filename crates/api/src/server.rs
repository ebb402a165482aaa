//! Axum router assembly.
//!
//! # Endpoints
//!
//! | Method | Path                                  |
//! |--------|---------------------------------------|
//! | `POST` | `/calendars/{id}/sync`                |
//! | `GET`  | `/calendar-events`                    |
//! | `PUT`  | `/calendar-events/{id}/classify`      |
//! | `POST` | `/calendar-events/bulk-classify`      |
//! | `POST` | `/rules/preview`                      |
//! | `POST` | `/rules/apply`                        |
//! | `GET`  | `/time-entries`                       |
//! | `POST` | `/time-entries/{id}/refresh`          |

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::handlers::{calendar_events, calendars, rules, time_entries};
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(calendars::router())
        .merge(calendar_events::router())
        .merge(rules::router())
        .merge(time_entries::router())
        .with_state(state)
}

/// Bind to `addr` and serve until the process exits.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn start(state: AppState, addr: &str) -> std::io::Result<()> {
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "chronarc-api listening");
    axum::serve(listener, app).await
}
