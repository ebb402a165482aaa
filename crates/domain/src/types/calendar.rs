//! Calendar connection, calendar, and event types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OAuth-backed connection to a remote calendar provider, owned by a user.
/// At most one per `(user_id, provider)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CalendarConnection {
    /// True when the access token expires within the refresh skew window.
    #[must_use]
    pub fn needs_token_refresh(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        self.token_expires_at - now <= skew
    }
}

/// A calendar owned by a connection, with its water-mark sync window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub colour: Option<String>,
    pub is_primary: bool,
    pub is_selected: bool,
    pub min_synced_date: Option<NaiveDate>,
    pub max_synced_date: Option<NaiveDate>,
    pub sync_token: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub needs_reauth: bool,
    pub sync_failure_count: u32,
}

impl Calendar {
    /// Whether this calendar is eligible to be picked up by the background
    /// scheduler (not quarantined, not flagged for reauth).
    #[must_use]
    pub fn is_syncable(&self) -> bool {
        !self.needs_reauth
            && self.sync_failure_count < crate::constants::BACKGROUND_MAX_FAILURES
    }

    #[must_use]
    pub fn water_mark(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.min_synced_date, self.max_synced_date) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    NeedsAction,
    Tentative,
}

crate::impl_domain_status_conversions!(ResponseStatus {
    Accepted => "accepted",
    Declined => "declined",
    NeedsAction => "needs_action",
    Tentative => "tentative",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transparency {
    Opaque,
    Transparent,
}

crate::impl_domain_status_conversions!(Transparency {
    Opaque => "opaque",
    Transparent => "transparent",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    Pending,
    Classified,
    Skipped,
}

crate::impl_domain_status_conversions!(ClassificationStatus {
    Pending => "pending",
    Classified => "classified",
    Skipped => "skipped",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Manual,
    Rule,
    Fingerprint,
}

crate::impl_domain_status_conversions!(ClassificationSource {
    Manual => "manual",
    Rule => "rule",
    Fingerprint => "fingerprint",
});

/// An attendee of a calendar event, carried in sync order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub is_self: bool,
    pub response_status: ResponseStatus,
}

/// A single event on a calendar, keyed uniquely by `(calendar_id, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    pub is_recurring: bool,
    pub response_status: ResponseStatus,
    pub transparency: Transparency,
    pub is_orphaned: bool,
    pub is_suppressed: bool,
    pub classification_status: ClassificationStatus,
    pub is_skipped: bool,
    pub needs_review: bool,
    pub project_id: Option<Uuid>,
    pub classification_source: Option<ClassificationSource>,
    pub classification_confidence: Option<f64>,
}

impl CalendarEvent {
    #[must_use]
    pub fn is_manually_classified(&self) -> bool {
        matches!(self.classification_source, Some(ClassificationSource::Manual))
    }

    /// Eligible to count toward classification/aggregation: not orphaned,
    /// not suppressed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        !self.is_orphaned && !self.is_suppressed
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    #[must_use]
    pub fn attendee_domains(&self) -> Vec<&str> {
        self.attendees
            .iter()
            .filter_map(|a| a.email.split('@').nth(1))
            .collect()
    }
}

/// Queued background work for gap-filling a calendar's water-mark window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub job_type: JobType,
    pub target_min_date: NaiveDate,
    pub target_max_date: NaiveDate,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ExpandWatermarks,
}

crate::impl_domain_status_conversions!(JobType {
    ExpandWatermarks => "expand_watermarks",
});
