//! Application constants.
//!
//! Centralized location for thresholds named by the sync, classification,
//! and scheduling components. All are overridable via configuration; these
//! are the defaults used when a value is not otherwise specified.

use chrono::Duration;

/// Water-mark freshness window: a synced range older than this is refreshed
/// incrementally on next access rather than treated as fresh.
pub const STALENESS_HOURS: i64 = 24;

#[must_use]
pub fn staleness() -> Duration {
    Duration::hours(STALENESS_HOURS)
}

/// Sum of matching skip-rule weights above which an event is classified as skipped.
pub const SKIP_THRESHOLD: f64 = 1.0;

/// Minimum winning weight for a project to be assigned during classification.
pub const PROJECT_THRESHOLD: f64 = 1.0;

/// Confidence below which a classification is flagged `needs_review`.
pub const REVIEW_THRESHOLD: f64 = 0.75;

/// Fingerprint bonus for an attendee whose email domain matches a project.
pub const FINGERPRINT_DOMAIN_WEIGHT: f64 = 2.0;

/// Fingerprint bonus for an attendee whose email exactly matches a project.
pub const FINGERPRINT_EMAIL_WEIGHT: f64 = 3.0;

/// Fingerprint bonus per deduplicated keyword match in title/description.
pub const FINGERPRINT_KEYWORD_WEIGHT: f64 = 1.0;

/// Weeks before "today" covered by the default initial sync window.
pub const DEFAULT_INITIAL_WINDOW_WEEKS_BEFORE: i64 = 4;

/// Weeks after "today" covered by the default initial sync window.
pub const DEFAULT_INITIAL_WINDOW_WEEKS_AFTER: i64 = 1;

/// Interval between background scheduler ticks, in seconds.
pub const BACKGROUND_SYNC_INTERVAL_SECS: u64 = 15 * 60;

/// Consecutive sync failures after which a calendar is quarantined.
pub const BACKGROUND_MAX_FAILURES: u32 = 3;

/// Default provider HTTP call timeout, in seconds.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Default database call timeout, in seconds.
pub const DATABASE_TIMEOUT_SECS: u64 = 5;

/// Credentials within this window of expiry are refreshed before use.
pub const TOKEN_REFRESH_SKEW_MINUTES: i64 = 5;

#[must_use]
pub fn token_refresh_skew() -> Duration {
    Duration::minutes(TOKEN_REFRESH_SKEW_MINUTES)
}

/// Quarter-hour rounding increment for computed hours.
pub const HOUR_ROUNDING_INCREMENT: f64 = 0.25;

/// Bounded number of queued gap-fill jobs drained per scheduler tick.
pub const MAX_GAP_FILL_JOBS_PER_TICK: usize = 10;
