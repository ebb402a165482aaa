//! Event store contract (§4.6).

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_domain::errors::Result;
use chronarc_domain::types::calendar::{
    Calendar, CalendarConnection, CalendarEvent, ClassificationSource, ClassificationStatus, SyncJob,
};
use uuid::Uuid;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Upsert by `(calendar_id, external_id)`. Must respect the invariant
    /// that a manually classified event's `project_id`, `is_skipped`, and
    /// `classification_source=manual` are never overwritten. Returns `true`
    /// when the row was newly inserted, `false` when an existing row was
    /// updated.
    async fn upsert(&self, event: &CalendarEvent) -> Result<bool>;

    async fn mark_orphaned_by_external_id(&self, calendar_id: Uuid, external_id: &str) -> Result<()>;

    /// Marks every stored event in `calendar_id` whose start lies in
    /// `[min, max]` and whose external id is not in `kept_external_ids` as
    /// orphaned. Returns the count marked.
    async fn mark_orphaned_in_range_except(
        &self,
        calendar_id: Uuid,
        kept_external_ids: &[String],
        min: NaiveDate,
        max: NaiveDate,
    ) -> Result<usize>;

    /// Manual classification, driven by the HTTP classify/bulk-classify
    /// endpoints. Always stamps `classification_source = manual`, which
    /// makes the row immune to future overwrites by [`Self::upsert`] and
    /// [`Self::apply_rule_classification`].
    async fn classify(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
    ) -> Result<CalendarEvent>;

    /// Classification driven by `apply_rules`. Stamps the real `source`
    /// (`rule` or `fingerprint`) and confidence/needs_review instead of
    /// hardcoding `manual`, and must not override a row already classified
    /// manually.
    async fn apply_rule_classification(
        &self,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
        confidence: f64,
        needs_review: bool,
        source: ClassificationSource,
    ) -> Result<CalendarEvent>;

    async fn list(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: Option<ClassificationStatus>,
        connection_id: Option<Uuid>,
    ) -> Result<Vec<CalendarEvent>>;

    async fn get_by_project_and_date(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>>;

    async fn get(&self, event_id: Uuid) -> Result<Option<CalendarEvent>>;
}

#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn get(&self, calendar_id: Uuid) -> Result<Option<Calendar>>;
    async fn list_for_connection(&self, connection_id: Uuid) -> Result<Vec<Calendar>>;
    async fn list_stale(&self, staleness: chrono::Duration, max_failures: u32) -> Result<Vec<Calendar>>;
    async fn save(&self, calendar: &Calendar) -> Result<()>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn get(&self, connection_id: Uuid) -> Result<Option<CalendarConnection>>;
    async fn save(&self, connection: &CalendarConnection) -> Result<()>;
    async fn mark_all_calendars_needs_reauth(&self, connection_id: Uuid) -> Result<()>;
}

/// Queue of gap-fill work the scheduler drains on each tick, bounded by
/// `max_gap_fill_jobs_per_tick`.
#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    async fn enqueue(&self, job: &SyncJob) -> Result<()>;

    /// Dequeues up to `limit` jobs ordered by `priority` descending, then
    /// oldest first, removing them from the queue.
    async fn dequeue_batch(&self, limit: usize) -> Result<Vec<SyncJob>>;
}
