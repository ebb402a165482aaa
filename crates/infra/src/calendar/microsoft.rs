//! Microsoft Graph calendar provider.

use async_trait::async_trait;
use chrono::NaiveDate;
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

const MICROSOFT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const MICROSOFT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

pub struct MicrosoftCalendarProvider {
    http: Client,
    oauth: OAuthTokenClient,
}

impl MicrosoftCalendarProvider {
    /// # Errors
    /// Returns an error if `redirect_uri` is not a valid URL.
    pub fn new(client_id: String, client_secret: String, redirect_uri: &str) -> Result<Self> {
        let oauth =
            OAuthTokenClient::new(client_id, client_secret, MICROSOFT_TOKEN_URL, redirect_uri)?;
        Ok(Self { http: Client::new(), oauth })
    }

    fn calendar_view_url(calendar_external_id: &str) -> String {
        if calendar_external_id.eq_ignore_ascii_case("primary") {
            format!("{MICROSOFT_GRAPH_API_BASE}/me/calendarView/delta")
        } else {
            format!("{MICROSOFT_GRAPH_API_BASE}/me/calendars/{calendar_external_id}/calendarView/delta")
        }
    }

    /// Retries the transient branch of [`Self::fetch_once`] with backoff;
    /// `SyncTokenInvalidated`/`Fatal` are returned to the caller immediately.
    async fn fetch(
        &self,
        credentials: &ProviderCredentials,
        url: String,
        params: Vec<(&str, String)>,
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        let policy = PredicateRetry::new(|error: &ProviderError, _attempt: u32| {
            matches!(error, ProviderError::Transient(_))
        });

        retry_with_policy(provider_retry_config(), policy, || self.fetch_once(credentials, &url, &params))
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
        url: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&credentials.access_token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
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
            return Err(ProviderError::Transient(format!("microsoft returned {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Fatal(format!("microsoft returned {}", response.status())));
        }

        let body: MicrosoftEventsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("failed to parse response: {e}")))?;

        let events = body.value.into_iter().filter_map(to_provider_event).collect();
        let delta_token = body.delta_link.as_deref().and_then(extract_delta_token);

        Ok(FetchEventsResult { events, next_sync_token: delta_token, full_sync: body.next_link.is_none() })
    }
}

#[async_trait]
impl CalendarProvider for MicrosoftCalendarProvider {
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
            .get(format!("{MICROSOFT_GRAPH_API_BASE}/me/calendars"))
            .bearer_auth(&credentials.access_token)
            .send()
            .await
            .map_err(crate::errors::InfraError::from)?
            .error_for_status()
            .map_err(crate::errors::InfraError::from)?;

        let body: MicrosoftCalendarListResponse =
            response.json().await.map_err(crate::errors::InfraError::from)?;

        Ok(body
            .value
            .into_iter()
            .map(|c| ProviderCalendar {
                external_id: c.id,
                name: c.name,
                colour: c.colour,
                is_primary: c.is_default_calendar.unwrap_or(false),
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
        let start = min.and_hms_opt(0, 0, 0).unwrap().format("%Y-%m-%dT%H:%M:%S").to_string();
        let end = max.and_hms_opt(23, 59, 59).unwrap().format("%Y-%m-%dT%H:%M:%S").to_string();

        self.fetch(
            credentials,
            Self::calendar_view_url(calendar_external_id),
            vec![("startDateTime", start), ("endDateTime", end)],
        )
        .await
    }

    async fn fetch_events_incremental(
        &self,
        credentials: &ProviderCredentials,
        calendar_external_id: &str,
        sync_token: &str,
    ) -> std::result::Result<FetchEventsResult, ProviderError> {
        // The Graph delta API embeds the token in the `$deltatoken` query
        // param of a full delta-link URL, not a bare opaque string; callers
        // always hand back exactly what `next_sync_token` returned.
        let url = if sync_token.starts_with("http") {
            sync_token.to_string()
        } else {
            format!("{}&$deltatoken={}", Self::calendar_view_url(calendar_external_id), sync_token)
        };

        self.fetch(credentials, url, Vec::new()).await
    }
}

fn to_provider_event(event: MicrosoftCalendarEvent) -> Option<ProviderEvent> {
    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email_address.address.trim();
            if email.is_empty() {
                warn!(event_id = %event.id, "attendee with empty email");
                return None;
            }
            Some(ProviderAttendee {
                email: email.to_string(),
                is_self: false,
                response_status: a.status.map(|s| s.response).unwrap_or_else(|| "none".to_string()),
            })
        })
        .collect();

    Some(ProviderEvent {
        id: event.id,
        status: if event.is_cancelled.unwrap_or(false) { "cancelled".to_string() } else { "confirmed".to_string() },
        summary: event.subject.unwrap_or_default(),
        description: event.body_preview.unwrap_or_default(),
        start: normalise_event_time(&event.start).parse().ok()?,
        end: normalise_event_time(&event.end).parse().ok()?,
        attendees,
        transparency: if event.show_as.as_deref() == Some("free") {
            "transparent".to_string()
        } else {
            "opaque".to_string()
        },
        recurring_event_id: event.series_master_id,
    })
}

fn normalise_event_time(event: &EventDateTime) -> String {
    let value = event.date_time.trim();
    if value.ends_with('Z') {
        value.to_owned()
    } else if event.time_zone.eq_ignore_ascii_case("utc") {
        format!("{value}Z")
    } else {
        value.to_owned()
    }
}

fn extract_delta_token(delta_link: &str) -> Option<String> {
    url::Url::parse(delta_link)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == "$deltatoken")
        .map(|(_, v)| v.into_owned())
}

#[derive(Debug, Deserialize)]
struct MicrosoftEventsResponse {
    value: Vec<MicrosoftCalendarEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MicrosoftCalendarEvent {
    id: String,
    subject: Option<String>,
    #[serde(rename = "bodyPreview")]
    body_preview: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(rename = "isCancelled")]
    is_cancelled: Option<bool>,
    #[serde(rename = "seriesMasterId")]
    series_master_id: Option<String>,
    #[serde(rename = "showAs")]
    show_as: Option<String>,
    attendees: Option<Vec<MicrosoftAttendee>>,
}

#[derive(Debug, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: String,
}

#[derive(Debug, Deserialize)]
struct MicrosoftAttendee {
    #[serde(rename = "emailAddress")]
    email_address: EmailAddress,
    status: Option<AttendeeStatus>,
}

#[derive(Debug, Deserialize)]
struct AttendeeStatus {
    response: String,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    address: String,
}

#[derive(Debug, Deserialize)]
struct MicrosoftCalendarListResponse {
    value: Vec<MicrosoftCalendarListEntry>,
}

#[derive(Debug, Deserialize)]
struct MicrosoftCalendarListEntry {
    id: String,
    name: String,
    #[serde(rename = "color")]
    colour: Option<String>,
    #[serde(rename = "isDefaultCalendar")]
    is_default_calendar: Option<bool>,
}
