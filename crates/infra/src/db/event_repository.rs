//! SQLCipher-backed `EventRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_core::ports::EventRepository;
use chronarc_domain::types::calendar::{
    Attendee, CalendarEvent, ClassificationSource, ClassificationStatus, ResponseStatus, Transparency,
};
use chronarc_domain::{ChronarcError, Result};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{parse_datetime, parse_opt_uuid, DbPool};

pub struct SqliteEventRepository {
    pool: DbPool,
}

impl SqliteEventRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarEventRaw> {
    Ok(CalendarEventRaw {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        external_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_at: row.get(5)?,
        end_at: row.get(6)?,
        attendees: row.get(7)?,
        is_recurring: row.get(8)?,
        response_status: row.get(9)?,
        transparency: row.get(10)?,
        is_orphaned: row.get(11)?,
        is_suppressed: row.get(12)?,
        classification_status: row.get(13)?,
        is_skipped: row.get(14)?,
        needs_review: row.get(15)?,
        project_id: row.get(16)?,
        classification_source: row.get(17)?,
        classification_confidence: row.get(18)?,
    })
}

struct CalendarEventRaw {
    id: String,
    calendar_id: String,
    external_id: String,
    title: String,
    description: String,
    start_at: String,
    end_at: String,
    attendees: String,
    is_recurring: bool,
    response_status: String,
    transparency: String,
    is_orphaned: bool,
    is_suppressed: bool,
    classification_status: String,
    is_skipped: bool,
    needs_review: bool,
    project_id: Option<String>,
    classification_source: Option<String>,
    classification_confidence: Option<f64>,
}

impl CalendarEventRaw {
    fn into_domain(self) -> Result<CalendarEvent> {
        Ok(CalendarEvent {
            id: super::parse_uuid(&self.id)?,
            calendar_id: super::parse_uuid(&self.calendar_id)?,
            external_id: self.external_id,
            title: self.title,
            description: self.description,
            start: parse_datetime(&self.start_at)?,
            end: parse_datetime(&self.end_at)?,
            attendees: super::json_decode::<Vec<Attendee>>(&self.attendees)?,
            is_recurring: self.is_recurring,
            response_status: self
                .response_status
                .parse::<ResponseStatus>()
                .map_err(ChronarcError::Internal)?,
            transparency: self.transparency.parse::<Transparency>().map_err(ChronarcError::Internal)?,
            is_orphaned: self.is_orphaned,
            is_suppressed: self.is_suppressed,
            classification_status: self
                .classification_status
                .parse::<ClassificationStatus>()
                .map_err(ChronarcError::Internal)?,
            is_skipped: self.is_skipped,
            needs_review: self.needs_review,
            project_id: parse_opt_uuid(self.project_id)?,
            classification_source: self
                .classification_source
                .map(|s| s.parse::<ClassificationSource>())
                .transpose()
                .map_err(ChronarcError::Internal)?,
            classification_confidence: self.classification_confidence,
        })
    }
}

const SELECT_COLUMNS: &str = "id, calendar_id, external_id, title, description, start_at, end_at, \
    attendees, is_recurring, response_status, transparency, is_orphaned, is_suppressed, \
    classification_status, is_skipped, needs_review, project_id, classification_source, \
    classification_confidence";

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn upsert(&self, event: &CalendarEvent) -> Result<bool> {
        let conn = self.pool.get()?;
        let attendees = serde_json::to_string(&event.attendees)
            .map_err(|e| ChronarcError::Internal(format!("failed to encode attendees: {e}")))?;

        let existed: bool = conn
            .query_row(
                "SELECT 1 FROM calendar_events WHERE calendar_id = ?1 AND external_id = ?2",
                params![event.calendar_id.to_string(), event.external_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        // Manual classification must never be overwritten by an upsert from
        // a sync pass: preserve the existing project/skip/source if the
        // stored row was manually classified.
        let existing_source: Option<String> = conn
            .query_row(
                "SELECT classification_source FROM calendar_events WHERE calendar_id = ?1 AND external_id = ?2",
                params![event.calendar_id.to_string(), event.external_id],
                |row| row.get(0),
            )
            .optional()?;
        let is_manual = existing_source.as_deref() == Some("manual");

        if is_manual {
            conn.execute(
                "UPDATE calendar_events SET title = ?1, description = ?2, start_at = ?3, end_at = ?4, \
                 attendees = ?5, is_recurring = ?6, response_status = ?7, transparency = ?8, \
                 is_orphaned = ?9, is_suppressed = ?10 \
                 WHERE calendar_id = ?11 AND external_id = ?12",
                params![
                    event.title,
                    event.description,
                    event.start.to_rfc3339(),
                    event.end.to_rfc3339(),
                    attendees,
                    event.is_recurring,
                    event.response_status.to_string(),
                    event.transparency.to_string(),
                    event.is_orphaned,
                    event.is_suppressed,
                    event.calendar_id.to_string(),
                    event.external_id,
                ],
            )?;
            return Ok(!existed);
        }

        conn.execute(
            "INSERT INTO calendar_events (id, calendar_id, external_id, title, description, start_at, \
             end_at, attendees, is_recurring, response_status, transparency, is_orphaned, is_suppressed, \
             classification_status, is_skipped, needs_review, project_id, classification_source, \
             classification_confidence) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19) \
             ON CONFLICT (calendar_id, external_id) DO UPDATE SET \
             title = excluded.title, description = excluded.description, start_at = excluded.start_at, \
             end_at = excluded.end_at, attendees = excluded.attendees, is_recurring = excluded.is_recurring, \
             response_status = excluded.response_status, transparency = excluded.transparency, \
             is_orphaned = excluded.is_orphaned, is_suppressed = excluded.is_suppressed",
            params![
                event.id.to_string(),
                event.calendar_id.to_string(),
                event.external_id,
                event.title,
                event.description,
                event.start.to_rfc3339(),
                event.end.to_rfc3339(),
                attendees,
                event.is_recurring,
                event.response_status.to_string(),
                event.transparency.to_string(),
                event.is_orphaned,
                event.is_suppressed,
                event.classification_status.to_string(),
                event.is_skipped,
                event.needs_review,
                event.project_id.map(|id| id.to_string()),
                event.classification_source.map(|s| s.to_string()),
                event.classification_confidence,
            ],
        )?;
        Ok(!existed)
    }

    async fn mark_orphaned_by_external_id(&self, calendar_id: Uuid, external_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE calendar_events SET is_orphaned = 1 WHERE calendar_id = ?1 AND external_id = ?2",
            params![calendar_id.to_string(), external_id],
        )?;
        Ok(())
    }

    async fn mark_orphaned_in_range_except(
        &self,
        calendar_id: Uuid,
        kept_external_ids: &[String],
        min: NaiveDate,
        max: NaiveDate,
    ) -> Result<usize> {
        let conn = self.pool.get()?;
        let placeholders = kept_external_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "UPDATE calendar_events SET is_orphaned = 1 \
             WHERE calendar_id = ? AND date(start_at) BETWEEN ? AND ? \
             AND external_id NOT IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bind_params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(calendar_id.to_string()),
            Box::new(min.to_string()),
            Box::new(max.to_string()),
        ];
        for id in kept_external_ids {
            bind_params.push(Box::new(id.clone()));
        }
        let refs: Vec<&dyn rusqlite::ToSql> = bind_params.iter().map(AsRef::as_ref).collect();
        let affected = stmt.execute(refs.as_slice())?;
        Ok(affected)
    }

    async fn classify(
        &self,
        _user_id: Uuid,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
    ) -> Result<CalendarEvent> {
        let conn = self.pool.get()?;
        let status = if skip { ClassificationStatus::Skipped } else { ClassificationStatus::Classified };
        conn.execute(
            "UPDATE calendar_events SET project_id = ?1, is_skipped = ?2, classification_status = ?3, \
             classification_source = 'manual', needs_review = 0 WHERE id = ?4",
            params![project_id.map(|id| id.to_string()), skip, status.to_string(), event_id.to_string()],
        )?;

        self.get(event_id).await?.ok_or_else(|| ChronarcError::not_found("calendar event"))
    }

    async fn apply_rule_classification(
        &self,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
        confidence: f64,
        needs_review: bool,
        source: ClassificationSource,
    ) -> Result<CalendarEvent> {
        let conn = self.pool.get()?;
        let status = if skip { ClassificationStatus::Skipped } else { ClassificationStatus::Classified };
        conn.execute(
            "UPDATE calendar_events SET project_id = ?1, is_skipped = ?2, classification_status = ?3, \
             classification_source = ?4, classification_confidence = ?5, needs_review = ?6 \
             WHERE id = ?7 AND (classification_source IS NULL OR classification_source != 'manual')",
            params![
                project_id.map(|id| id.to_string()),
                skip,
                status.to_string(),
                source.to_string(),
                confidence,
                needs_review,
                event_id.to_string(),
            ],
        )?;

        self.get(event_id).await?.ok_or_else(|| ChronarcError::not_found("calendar event"))
    }

    async fn list(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: Option<ClassificationStatus>,
        connection_id: Option<Uuid>,
    ) -> Result<Vec<CalendarEvent>> {
        let conn = self.pool.get()?;
        let mut sql = format!(
            "SELECT {SELECT_COLUMNS} FROM calendar_events e \
             JOIN calendars c ON c.id = e.calendar_id \
             JOIN calendar_connections conn ON conn.id = c.connection_id \
             WHERE conn.user_id = ?1 AND date(e.start_at) BETWEEN ?2 AND ?3"
        );
        let mut bind_params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(user_id.to_string()),
            Box::new(start.to_string()),
            Box::new(end.to_string()),
        ];
        if let Some(status) = status {
            sql.push_str(" AND e.classification_status = ?4");
            bind_params.push(Box::new(status.to_string()));
        }
        if let Some(connection_id) = connection_id {
            sql.push_str(&format!(" AND c.connection_id = ?{}", bind_params.len() + 1));
            bind_params.push(Box::new(connection_id.to_string()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::ToSql> = bind_params.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(refs.as_slice(), row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_domain()?);
        }
        Ok(events)
    }

    async fn get_by_project_and_date(
        &self,
        _user_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM calendar_events \
             WHERE project_id = ?1 AND date(start_at) = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id.to_string(), date.to_string()], row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_domain()?);
        }
        Ok(events)
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<CalendarEvent>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM calendar_events WHERE id = ?1");
        let raw = conn
            .query_row(&sql, params![event_id.to_string()], row_to_event)
            .optional()?;
        raw.map(CalendarEventRaw::into_domain).transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn seed_connection_and_calendar(pool: &DbPool) -> (Uuid, Uuid) {
        let conn = pool.get().unwrap();
        let user_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();
        let calendar_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO calendar_connections (id, user_id, provider, access_token, refresh_token, \
             token_expires_at, created_at) VALUES (?1, ?2, 'google', 'a', 'r', ?3, ?3)",
            params![connection_id.to_string(), user_id.to_string(), Utc::now().to_rfc3339()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO calendars (id, connection_id, external_id, display_name) VALUES (?1, ?2, 'primary', 'Work')",
            params![calendar_id.to_string(), connection_id.to_string()],
        )
        .unwrap();
        (user_id, calendar_id)
    }

    fn sample_event(calendar_id: Uuid) -> CalendarEvent {
        CalendarEvent {
            id: Uuid::new_v4(),
            calendar_id,
            external_id: "ext-1".to_string(),
            title: "Sync".to_string(),
            description: String::new(),
            start: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap(),
            attendees: vec![Attendee {
                email: "a@acme.com".to_string(),
                is_self: false,
                response_status: ResponseStatus::Accepted,
            }],
            is_recurring: false,
            response_status: ResponseStatus::Accepted,
            transparency: Transparency::Opaque,
            is_orphaned: false,
            is_suppressed: false,
            classification_status: ClassificationStatus::Pending,
            is_skipped: false,
            needs_review: false,
            project_id: None,
            classification_source: None,
            classification_confidence: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let pool = DbPool::open_in_memory().unwrap();
        let (_user_id, calendar_id) = seed_connection_and_calendar(&pool);
        let repo = SqliteEventRepository::new(pool);
        let event = sample_event(calendar_id);

        repo.upsert(&event).await.unwrap();
        let fetched = repo.get(event.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Sync");
        assert_eq!(fetched.attendees.len(), 1);
    }

    #[tokio::test]
    async fn upsert_never_overwrites_manual_classification() {
        let pool = DbPool::open_in_memory().unwrap();
        let (user_id, calendar_id) = seed_connection_and_calendar(&pool);
        let repo = SqliteEventRepository::new(pool);
        let event = sample_event(calendar_id);
        repo.upsert(&event).await.unwrap();

        let project_id = Uuid::new_v4();
        repo.classify(user_id, event.id, Some(project_id), false).await.unwrap();

        let mut resynced = event.clone();
        resynced.title = "Renamed sync".to_string();
        repo.upsert(&resynced).await.unwrap();

        let fetched = repo.get(event.id).await.unwrap().unwrap();
        assert_eq!(fetched.project_id, Some(project_id));
        assert_eq!(fetched.title, "Renamed sync");
    }

    #[tokio::test]
    async fn mark_orphaned_in_range_except_skips_kept_ids() {
        let pool = DbPool::open_in_memory().unwrap();
        let (_user_id, calendar_id) = seed_connection_and_calendar(&pool);
        let repo = SqliteEventRepository::new(pool);
        let keep = sample_event(calendar_id);
        let mut drop_me = sample_event(calendar_id);
        drop_me.external_id = "ext-2".to_string();
        repo.upsert(&keep).await.unwrap();
        repo.upsert(&drop_me).await.unwrap();

        let affected = repo
            .mark_orphaned_in_range_except(
                calendar_id,
                &[keep.external_id.clone()],
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        assert!(!repo.get(keep.id).await.unwrap().unwrap().is_orphaned);
        assert!(repo.get(drop_me.id).await.unwrap().unwrap().is_orphaned);
    }
}
