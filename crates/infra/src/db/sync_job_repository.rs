//! SQLCipher-backed `SyncJobRepository`.

use async_trait::async_trait;
use chronarc_core::ports::SyncJobRepository;
use chronarc_domain::types::calendar::{JobType, SyncJob};
use chronarc_domain::{ChronarcError, Result};
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::{parse_date, parse_uuid, DbPool};

pub struct SqliteSyncJobRepository {
    pool: DbPool,
}

impl SqliteSyncJobRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, calendar_id, job_type, target_min_date, target_max_date, priority";

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncJobRaw> {
    Ok(SyncJobRaw {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        job_type: row.get(2)?,
        target_min_date: row.get(3)?,
        target_max_date: row.get(4)?,
        priority: row.get(5)?,
    })
}

struct SyncJobRaw {
    id: String,
    calendar_id: String,
    job_type: String,
    target_min_date: String,
    target_max_date: String,
    priority: i32,
}

impl SyncJobRaw {
    fn into_domain(self) -> Result<SyncJob> {
        Ok(SyncJob {
            id: parse_uuid(&self.id)?,
            calendar_id: parse_uuid(&self.calendar_id)?,
            job_type: self.job_type.parse::<JobType>().map_err(ChronarcError::Internal)?,
            target_min_date: parse_date(&self.target_min_date)?,
            target_max_date: parse_date(&self.target_max_date)?,
            priority: self.priority,
        })
    }
}

#[async_trait]
impl SyncJobRepository for SqliteSyncJobRepository {
    async fn enqueue(&self, job: &SyncJob) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO sync_jobs (id, calendar_id, job_type, target_min_date, target_max_date, \
             priority, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id.to_string(),
                job.calendar_id.to_string(),
                job.job_type.to_string(),
                job.target_min_date.to_string(),
                job.target_max_date.to_string(),
                job.priority,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn dequeue_batch(&self, limit: usize) -> Result<Vec<SyncJob>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM sync_jobs ORDER BY priority DESC, created_at ASC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], row_to_job)?;
        let mut out = Vec::new();
        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            ids.push(raw.id.clone());
            out.push(SyncJobRaw::into_domain(raw)?);
        }

        if !ids.is_empty() {
            let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!("DELETE FROM sync_jobs WHERE id IN ({placeholders})");
            let refs: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
            conn.execute(&sql, refs.as_slice())?;
        }

        Ok(out)
    }
}
