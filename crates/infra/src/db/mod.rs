//! SQLCipher-backed persistence: connection pool and repository
//! implementations of the `chronarc-core` ports.

pub mod calendar_repository;
pub mod connection_repository;
pub mod event_repository;
pub mod pool;
pub mod project_repository;
pub mod rule_repository;
pub mod sync_job_repository;
pub mod time_entry_repository;

pub use calendar_repository::SqliteCalendarRepository;
pub use connection_repository::SqliteConnectionRepository;
pub use event_repository::SqliteEventRepository;
pub use pool::DbPool;
pub use project_repository::SqliteProjectRepository;
pub use rule_repository::SqliteRuleRepository;
pub use sync_job_repository::SqliteSyncJobRepository;
pub use time_entry_repository::SqliteTimeEntryRepository;

use chrono::{DateTime, NaiveDate, Utc};
use chronarc_domain::{ChronarcError, Result};
use uuid::Uuid;

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ChronarcError::Internal(format!("corrupt uuid column: {e}")))
}

pub(crate) fn parse_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.map(|s| parse_uuid(&s)).transpose()
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChronarcError::Internal(format!("corrupt timestamp column: {e}")))
}

pub(crate) fn parse_opt_datetime(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_datetime).transpose()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ChronarcError::Internal(format!("corrupt date column: {e}")))
}

pub(crate) fn parse_opt_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref().map(parse_date).transpose()
}

pub(crate) fn json_decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| ChronarcError::Internal(format!("corrupt json column: {e}")))
}
