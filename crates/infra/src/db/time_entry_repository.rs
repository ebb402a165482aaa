//! SQLCipher-backed `TimeEntryRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_core::ports::TimeEntryRepository;
use chronarc_domain::types::time_entry::{MaterialisedState, TimeEntry};
use chronarc_domain::Result;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{json_decode, parse_date, parse_uuid, DbPool};

pub struct SqliteTimeEntryRepository {
    pool: DbPool,
}

impl SqliteTimeEntryRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, project_id, date, hours, title, description, \
    contributing_events, snapshot_computed_hours, is_pinned, is_locked, invoice_id";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeEntryRaw> {
    Ok(TimeEntryRaw {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        date: row.get(3)?,
        hours: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        contributing_events: row.get(7)?,
        snapshot_computed_hours: row.get(8)?,
        is_pinned: row.get(9)?,
        is_locked: row.get(10)?,
        invoice_id: row.get(11)?,
    })
}

struct TimeEntryRaw {
    id: String,
    user_id: String,
    project_id: String,
    date: String,
    hours: f64,
    title: String,
    description: String,
    contributing_events: String,
    snapshot_computed_hours: Option<f64>,
    is_pinned: bool,
    is_locked: bool,
    invoice_id: Option<String>,
}

impl TimeEntryRaw {
    fn into_domain(self) -> Result<TimeEntry> {
        Ok(TimeEntry {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            project_id: parse_uuid(&self.project_id)?,
            date: parse_date(&self.date)?,
            hours: self.hours,
            title: self.title,
            description: self.description,
            contributing_events: json_decode::<Vec<Uuid>>(&self.contributing_events)?,
            materialised: self
                .snapshot_computed_hours
                .map(|snapshot_computed_hours| MaterialisedState { snapshot_computed_hours }),
            is_pinned: self.is_pinned,
            is_locked: self.is_locked,
            invoice_id: self.invoice_id.map(|s| super::parse_uuid(&s)).transpose()?,
        })
    }
}

#[async_trait]
impl TimeEntryRepository for SqliteTimeEntryRepository {
    async fn get(&self, id: Uuid) -> Result<Option<TimeEntry>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM time_entries WHERE id = ?1");
        let raw = conn.query_row(&sql, params![id.to_string()], row_to_entry).optional()?;
        raw.map(TimeEntryRaw::into_domain).transpose()
    }

    async fn get_by_project_and_date(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<TimeEntry>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM time_entries WHERE user_id = ?1 AND project_id = ?2 AND date = ?3"
        );
        let raw = conn
            .query_row(
                &sql,
                params![user_id.to_string(), project_id.to_string(), date.to_string()],
                row_to_entry,
            )
            .optional()?;
        raw.map(TimeEntryRaw::into_domain).transpose()
    }

    async fn list_materialised(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        project_id: Option<Uuid>,
    ) -> Result<Vec<TimeEntry>> {
        let conn = self.pool.get()?;
        let mut sql = format!(
            "SELECT {SELECT_COLUMNS} FROM time_entries WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3"
        );
        let mut bind_params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(user_id.to_string()),
            Box::new(start.to_string()),
            Box::new(end.to_string()),
        ];
        if let Some(project_id) = project_id {
            sql.push_str(" AND project_id = ?4");
            bind_params.push(Box::new(project_id.to_string()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::ToSql> = bind_params.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(refs.as_slice(), row_to_entry)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_domain()?);
        }
        Ok(out)
    }

    async fn save(&self, entry: &TimeEntry) -> Result<()> {
        let conn = self.pool.get()?;
        let contributing_events = serde_json::to_string(&entry.contributing_events)
            .map_err(|e| chronarc_domain::ChronarcError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO time_entries (id, user_id, project_id, date, hours, title, description, \
             contributing_events, snapshot_computed_hours, is_pinned, is_locked, invoice_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT (user_id, project_id, date) DO UPDATE SET hours = excluded.hours, \
             title = excluded.title, description = excluded.description, \
             contributing_events = excluded.contributing_events, \
             snapshot_computed_hours = excluded.snapshot_computed_hours, is_pinned = excluded.is_pinned, \
             is_locked = excluded.is_locked, invoice_id = excluded.invoice_id",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.project_id.to_string(),
                entry.date.to_string(),
                entry.hours,
                entry.title,
                entry.description,
                contributing_events,
                entry.materialised.as_ref().map(|m| m.snapshot_computed_hours),
                entry.is_pinned,
                entry.is_locked,
                entry.invoice_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }
}
