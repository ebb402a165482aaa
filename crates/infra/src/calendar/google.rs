//! Google Calendar provider.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use chronarc_common::resilience::retry::{policies::PredicateRetry, retry_with_policy, RetryError};
use chronarc_core::ports::calendar_provider::{
    CalendarProvider, FetchEventsResult, ProviderAttendee, ProviderCalendar, ProviderCredentials,
    ProviderError, ProviderEvent, TokenRefreshResult,
};
use chronarc_domain::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::oauth::OAuthTokenClient;
use super::retry_policy::provider_retry_config;

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub struct GoogleCalendarProvider {
    http: Client,
    oauth: OAuthTokenClient,
}

impl GoogleCalendarProvider {
    /// # Errors
    /// Returns an error if `redirect_uri` is not a valid URL.
    pub fn new(client_id: String, client_secret: String, redirect_uri: &str) -> Result<Self> {
        let oauth = OAuthTokenClient::new(client_id, client_secret, GOOGLE_TOKEN_URL, redirect_uri)?;
        Ok(Self { http: Client::new(), oauth })
    }

    fn events_url(calendar_external_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            GOOGLE_CALENDAR_API_BASE,
            urlencoding_minimal(calendar_external_id)
        )
    }

    /// Retries the transient branch of [`Self::fetch_once`] with backoff;
    /// `SyncTokenInvalidated`/`Fatal` are returned to the caller immediately.
    async fn fetch(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        params: Vec<(&str, String)>,
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        let policy = PredicateRetry::new(|error: &ProviderError, _attempt: u32| {
            matches!(error, ProviderError::Transient(_))
        });

        retry_with_policy(provider_retry_config(), policy, || {
            self.fetch_once(credentials, calendar_external_id, &params)
        })
        .await
        .map_err(|err| match err {
            RetryError::NonRetryable { source } => source,
            RetryError::AttemptsExhausted { .. } | RetryError::TimeoutExceeded { .. } => {
                ProviderError::Transient("exhausted retries against the calendar provider".to_string())
            }
            RetryError::InvalidConfiguration { message } => ProviderError::Fatal(message),
        })
    }

    async fn fetch_once(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        let response = self
            .http
            .get(Self::events_url(calendar_external_id))
            .bearer_auth(&credentials.access_token)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("request failed: {e}")))?;

        if response.status().as_u16() == 410 {
            return Err(ProviderError::SyncTokenInvalidated);
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Fatal("access token rejected".to_string()));
        }
        if response.status().as_u16() == 429 || response.status().is_server_error() {
            return Err(ProviderError::Transient(format!("google returned {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Fatal(format!("google returned {}", response.status())));
        }

        let body: GoogleEventsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("failed to parse response: {e}")))?;

        let events = body.items.into_iter().filter_map(to_provider_event).collect();

        Ok(FetchEventsResult {
            events,
            next_sync_token: body.next_sync_token,
            full_sync: body.next_page_token.is_none(),
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    async fn exchange_code(&self, code: &str) -> Result<(ProviderCredentials, i64)> {
        let (access_token, refresh_token, expires_in) = self.oauth.exchange_code(code).await?;
        Ok((ProviderCredentials { access_token, refresh_token }, expires_in))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResult> {
        self.oauth.refresh(refresh_token).await
    }

    async fn list_calendars(&self, credentials: &ProviderCredentials) -> Result<Vec<ProviderCalendar>> {
        let response = self
            .http
            .get(format!("{GOOGLE_CALENDAR_API_BASE}/users/me/calendarList"))
            .bearer_auth(&credentials.access_token)
            .send()
            .await
            .map_err(crate::errors::InfraError::from)?
            .error_for_status()
            .map_err(crate::errors::InfraError::from)?;

        let body: GoogleCalendarListResponse =
            response.json().await.map_err(crate::errors::InfraError::from)?;
        Ok(body
            .items
            .into_iter()
            .map(|c| ProviderCalendar {
                external_id: c.id,
                name: c.summary,
                colour: c.background_color,
                is_primary: c.primary.unwrap_or(false),
            })
            .collect())
    }

    async fn fetch_events(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        min: NaiveDate,
        max: NaiveDate,
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        let time_min = Utc.from_utc_datetime(&min.and_hms_opt(0, 0, 0).unwrap()).to_rfc3339();
        let time_max = Utc.from_utc_datetime(&max.and_hms_opt(23, 59, 59).unwrap()).to_rfc3339();

        self.fetch(
            credentials,
            calendar_external_id,
            vec![
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true".to_string()),
                ("showDeleted", "true".to_string()),
            ],
        )
        .await
    }

    async fn fetch_events_incremental(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        sync_token: &str,
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        self.fetch(
            credentials,
            calendar_external_id,
            vec![("syncToken", sync_token.to_string()), ("showDeleted", "true".to_string())],
        )
        .await
    }
}

fn to_provider_event(event: GoogleCalendarEvent) -> Option<ProviderEvent> {
    let start = normalise_event_time(&event.start)?;
    let end = normalise_event_time(&event.end)?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email.trim();
            if email.is_empty() {
                warn!(event_id = %event.id, "attendee with empty email");
                return None;
            }
            Some(ProviderAttendee {
                email: email.to_string(),
                is_self: a.is_self.unwrap_or(false),
                response_status: a.response_status.unwrap_or_else(|| "needsAction".to_string()),
            })
        })
        .collect();

    Some(ProviderEvent {
        id: event.id,
        status: event.status.unwrap_or_else(|| "confirmed".to_string()),
        summary: event.summary.unwrap_or_default(),
        description: event.description.unwrap_or_default(),
        start: start.parse().ok()?,
        end: end.parse().ok()?,
        attendees,
        transparency: event.transparency.unwrap_or_else(|| "opaque".to_string()),
        recurring_event_id: event.recurring_event_id,
    })
}

/// Google sends timed events as an RFC3339 `dateTime` and all-day events as
/// a bare `date` (e.g. `"2026-01-01"`), which isn't itself a valid RFC3339
/// timestamp; widen it to midnight UTC.
fn normalise_event_time(value: &EventDateTime) -> Option<String> {
    if let Some(dt) = &value.date_time {
        return Some(dt.clone());
    }
    value.date.as_ref().map(|date| format!("{date}T00:00:00Z"))
}

/// Escapes the handful of characters Google's calendar-id path segment
/// actually needs escaped (`/`, `@` survive unescaped in practice, but a
/// literal `#` or space would break the URL).
fn urlencoding_minimal(value: &str) -> String {
    value.replace('#', "%23").replace(' ', "%20")
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    items: Vec<GoogleCalendarEvent>,
    #[serde(rename = "nextSyncToken")]
    next_sync_token: Option<String>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(rename = "recurringEventId")]
    recurring_event_id: Option<String>,
    transparency: Option<String>,
    attendees: Option<Vec<GoogleAttendee>>,
}

#[derive(Debug, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleAttendee {
    email: String,
    #[serde(rename = "self")]
    is_self: Option<bool>,
    #[serde(rename = "responseStatus")]
    response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarListResponse {
    items: Vec<GoogleCalendarListEntry>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarListEntry {
    id: String,
    summary: String,
    #[serde(rename = "backgroundColor")]
    background_color: Option<String>,
    primary: Option<bool>,
}
