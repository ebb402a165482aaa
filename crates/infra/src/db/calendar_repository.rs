//! SQLCipher-backed `CalendarRepository`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use chronarc_core::ports::CalendarRepository;
use chronarc_domain::types::calendar::Calendar;
use chronarc_domain::Result;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{parse_opt_date, parse_opt_datetime, parse_uuid, DbPool};

pub struct SqliteCalendarRepository {
    pool: DbPool,
}

impl SqliteCalendarRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, connection_id, external_id, display_name, colour, is_primary, \
    is_selected, min_synced_date, max_synced_date, sync_token, last_synced_at, needs_reauth, \
    sync_failure_count";

fn row_to_calendar(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarRaw> {
    Ok(CalendarRaw {
        id: row.get(0)?,
        connection_id: row.get(1)?,
        external_id: row.get(2)?,
        display_name: row.get(3)?,
        colour: row.get(4)?,
        is_primary: row.get(5)?,
        is_selected: row.get(6)?,
        min_synced_date: row.get(7)?,
        max_synced_date: row.get(8)?,
        sync_token: row.get(9)?,
        last_synced_at: row.get(10)?,
        needs_reauth: row.get(11)?,
        sync_failure_count: row.get(12)?,
    })
}

struct CalendarRaw {
    id: String,
    connection_id: String,
    external_id: String,
    display_name: String,
    colour: Option<String>,
    is_primary: bool,
    is_selected: bool,
    min_synced_date: Option<String>,
    max_synced_date: Option<String>,
    sync_token: Option<String>,
    last_synced_at: Option<String>,
    needs_reauth: bool,
    sync_failure_count: u32,
}

impl CalendarRaw {
    fn into_domain(self) -> Result<Calendar> {
        Ok(Calendar {
            id: parse_uuid(&self.id)?,
            connection_id: parse_uuid(&self.connection_id)?,
            external_id: self.external_id,
            display_name: self.display_name,
            colour: self.colour,
            is_primary: self.is_primary,
            is_selected: self.is_selected,
            min_synced_date: parse_opt_date(self.min_synced_date)?,
            max_synced_date: parse_opt_date(self.max_synced_date)?,
            sync_token: self.sync_token,
            last_synced_at: parse_opt_datetime(self.last_synced_at)?,
            needs_reauth: self.needs_reauth,
            sync_failure_count: self.sync_failure_count,
        })
    }
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    async fn get(&self, calendar_id: Uuid) -> Result<Option<Calendar>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM calendars WHERE id = ?1");
        let raw = conn.query_row(&sql, params![calendar_id.to_string()], row_to_calendar).optional()?;
        raw.map(CalendarRaw::into_domain).transpose()
    }

    async fn list_for_connection(&self, connection_id: Uuid) -> Result<Vec<Calendar>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM calendars WHERE connection_id = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![connection_id.to_string()], row_to_calendar)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_domain()?);
        }
        Ok(out)
    }

    async fn list_stale(&self, staleness: Duration, max_failures: u32) -> Result<Vec<Calendar>> {
        let conn = self.pool.get()?;
        let threshold = (Utc::now() - staleness).to_rfc3339();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM calendars \
             WHERE needs_reauth = 0 AND is_selected = 1 AND sync_failure_count < ?1 \
             AND (last_synced_at IS NULL OR last_synced_at <= ?2)"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![max_failures, threshold], row_to_calendar)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_domain()?);
        }
        Ok(out)
    }

    async fn save(&self, calendar: &Calendar) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO calendars (id, connection_id, external_id, display_name, colour, is_primary, \
             is_selected, min_synced_date, max_synced_date, sync_token, last_synced_at, needs_reauth, \
             sync_failure_count) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name, colour = excluded.colour, \
             is_primary = excluded.is_primary, is_selected = excluded.is_selected, \
             min_synced_date = excluded.min_synced_date, max_synced_date = excluded.max_synced_date, \
             sync_token = excluded.sync_token, last_synced_at = excluded.last_synced_at, \
             needs_reauth = excluded.needs_reauth, sync_failure_count = excluded.sync_failure_count",
            params![
                calendar.id.to_string(),
                calendar.connection_id.to_string(),
                calendar.external_id,
                calendar.display_name,
                calendar.colour,
                calendar.is_primary,
                calendar.is_selected,
                calendar.min_synced_date.map(|d| d.to_string()),
                calendar.max_synced_date.map(|d| d.to_string()),
                calendar.sync_token,
                calendar.last_synced_at.map(|dt| dt.to_rfc3339()),
                calendar.needs_reauth,
                calendar.sync_failure_count,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn seed_connection(pool: &DbPool) -> Uuid {
        let conn = pool.get().unwrap();
        let connection_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO calendar_connections (id, user_id, provider, access_token, refresh_token, \
             token_expires_at, created_at) VALUES (?1, ?2, 'google', 'a', 'r', ?3, ?3)",
            params![connection_id.to_string(), Uuid::new_v4().to_string(), Utc::now().to_rfc3339()],
        )
        .unwrap();
        connection_id
    }

    fn sample_calendar(connection_id: Uuid) -> Calendar {
        Calendar {
            id: Uuid::new_v4(),
            connection_id,
            external_id: "primary".to_string(),
            display_name: "Work".to_string(),
            colour: None,
            is_primary: true,
            is_selected: true,
            min_synced_date: None,
            max_synced_date: None,
            sync_token: None,
            last_synced_at: None,
            needs_reauth: false,
            sync_failure_count: 0,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let pool = DbPool::open_in_memory().unwrap();
        let connection_id = seed_connection(&pool);
        let repo = SqliteCalendarRepository::new(pool);
        let cal = sample_calendar(connection_id);
        repo.save(&cal).await.unwrap();

        let fetched = repo.get(cal.id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "Work");
    }

    #[tokio::test]
    async fn list_stale_excludes_reauth_and_recent() {
        let pool = DbPool::open_in_memory().unwrap();
        let connection_id = seed_connection(&pool);
        let repo = SqliteCalendarRepository::new(pool);

        let mut stale = sample_calendar(connection_id);
        stale.last_synced_at = Some(Utc::now() - Duration::hours(48));
        let mut fresh = sample_calendar(connection_id);
        fresh.external_id = "secondary".to_string();
        fresh.last_synced_at = Some(Utc::now());
        let mut reauth = sample_calendar(connection_id);
        reauth.external_id = "tertiary".to_string();
        reauth.needs_reauth = true;
        reauth.last_synced_at = Some(Utc::now() - Duration::hours(48));

        repo.save(&stale).await.unwrap();
        repo.save(&fresh).await.unwrap();
        repo.save(&reauth).await.unwrap();

        let result = repo.list_stale(Duration::hours(24), 3).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, stale.id);
    }
}
