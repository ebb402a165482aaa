//! The remote calendar provider capability set (§6).

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_domain::errors::Result;

#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct ProviderCalendar {
    pub external_id: String,
    pub name: String,
    pub colour: Option<String>,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderAttendee {
    pub email: String,
    pub is_self: bool,
    pub response_status: String,
}

#[derive(Debug, Clone)]
pub struct ProviderEvent {
    pub id: String,
    pub status: String,
    pub summary: String,
    pub description: String,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub attendees: Vec<ProviderAttendee>,
    pub transparency: String,
    pub recurring_event_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchEventsResult {
    pub events: Vec<ProviderEvent>,
    pub next_sync_token: Option<String>,
    pub full_sync: bool,
}

#[derive(Debug, Clone)]
pub struct TokenRefreshResult {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

/// Error distinguished so the sync executor can fall back to a full pull
/// instead of surfacing a generic provider failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("sync token invalidated")]
    SyncTokenInvalidated,
    #[error("provider error (transient): {0}")]
    Transient(String),
    #[error("provider error (fatal): {0}")]
    Fatal(String),
}

/// Capability set a remote calendar provider must expose. A production
/// implementation talks to the real API; tests use an in-memory fake.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<(ProviderCredentials, i64)>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResult>;

    async fn list_calendars(&self, credentials: &ProviderCredentials) -> Result<Vec<ProviderCalendar>>;

    async fn fetch_events(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        min: NaiveDate,
        max: NaiveDate,
    ) -> std::result::Result<FetchEventsResult, ProviderError>;

    async fn fetch_events_incremental(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        sync_token: &str,
    ) -> std::result::Result<FetchEventsResult, ProviderError>;
}
