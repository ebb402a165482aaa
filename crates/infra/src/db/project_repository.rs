//! SQLCipher-backed `ProjectRepository`.

use std::collections::HashSet;

use async_trait::async_trait;
use chronarc_core::ports::ProjectRepository;
use chronarc_domain::types::project::Project;
use chronarc_domain::Result;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{json_decode, parse_uuid, DbPool};

pub struct SqliteProjectRepository {
    pool: DbPool,
}

impl SqliteProjectRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, name, domains, emails, keywords, is_archived, is_hidden_by_default, does_not_accumulate_hours";

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRaw> {
    Ok(ProjectRaw {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        domains: row.get(3)?,
        emails: row.get(4)?,
        keywords: row.get(5)?,
        is_archived: row.get(6)?,
        is_hidden_by_default: row.get(7)?,
        does_not_accumulate_hours: row.get(8)?,
    })
}

struct ProjectRaw {
    id: String,
    user_id: String,
    name: String,
    domains: String,
    emails: String,
    keywords: String,
    is_archived: bool,
    is_hidden_by_default: bool,
    does_not_accumulate_hours: bool,
}

impl ProjectRaw {
    fn into_domain(self) -> Result<Project> {
        Ok(Project {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            name: self.name,
            domains: json_decode::<HashSet<String>>(&self.domains)?,
            emails: json_decode::<HashSet<String>>(&self.emails)?,
            keywords: json_decode::<HashSet<String>>(&self.keywords)?,
            is_archived: self.is_archived,
            is_hidden_by_default: self.is_hidden_by_default,
            does_not_accumulate_hours: self.does_not_accumulate_hours,
        })
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn list_active(&self, user_id: Uuid) -> Result<Vec<Project>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM projects WHERE user_id = ?1 AND is_archived = 0"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_project)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_domain()?);
        }
        Ok(out)
    }

    async fn get(&self, project_id: Uuid) -> Result<Option<Project>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM projects WHERE id = ?1");
        let raw = conn.query_row(&sql, params![project_id.to_string()], row_to_project).optional()?;
        raw.map(ProjectRaw::into_domain).transpose()
    }
}

/// Inserts or updates a project row; not part of `ProjectRepository` (the
/// port is read-only) but used by seeding and by the project-management
/// surface this crate does not expose an HTTP route for.
impl SqliteProjectRepository {
    /// # Errors
    /// Returns an error if the write fails or fields fail to encode.
    pub async fn save(&self, project: &Project) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO projects (id, user_id, name, domains, emails, keywords, is_archived, \
             is_hidden_by_default, does_not_accumulate_hours) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, domains = excluded.domains, \
             emails = excluded.emails, keywords = excluded.keywords, is_archived = excluded.is_archived, \
             is_hidden_by_default = excluded.is_hidden_by_default, \
             does_not_accumulate_hours = excluded.does_not_accumulate_hours",
            params![
                project.id.to_string(),
                project.user_id.to_string(),
                project.name,
                serde_json::to_string(&project.domains)
                    .map_err(|e| chronarc_domain::ChronarcError::Internal(e.to_string()))?,
                serde_json::to_string(&project.emails)
                    .map_err(|e| chronarc_domain::ChronarcError::Internal(e.to_string()))?,
                serde_json::to_string(&project.keywords)
                    .map_err(|e| chronarc_domain::ChronarcError::Internal(e.to_string()))?,
                project.is_archived,
                project.is_hidden_by_default,
                project.does_not_accumulate_hours,
            ],
        )?;
        Ok(())
    }
}
