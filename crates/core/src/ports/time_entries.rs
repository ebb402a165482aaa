//! Materialised time-entry persistence port.

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_domain::errors::Result;
use chronarc_domain::types::time_entry::TimeEntry;
use uuid::Uuid;

#[async_trait]
pub trait TimeEntryRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<TimeEntry>>;

    async fn get_by_project_and_date(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<TimeEntry>>;

    async fn list_materialised(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        project_id: Option<Uuid>,
    ) -> Result<Vec<TimeEntry>>;

    async fn save(&self, entry: &TimeEntry) -> Result<()>;
}
