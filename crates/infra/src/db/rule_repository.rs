//! SQLCipher-backed `RuleRepository`.

use async_trait::async_trait;
use chronarc_core::ports::RuleRepository;
use chronarc_domain::types::project::ClassificationRule;
use chronarc_domain::Result;
use rusqlite::params;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid, DbPool};

pub struct SqliteRuleRepository {
    pool: DbPool,
}

impl SqliteRuleRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save(&self, rule: &ClassificationRule) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO classification_rules (id, user_id, query, project_id, attended, weight, \
             is_enabled) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT (id) DO UPDATE SET query = excluded.query, project_id = excluded.project_id, \
             attended = excluded.attended, weight = excluded.weight, is_enabled = excluded.is_enabled",
            params![
                rule.id.to_string(),
                rule.user_id.to_string(),
                rule.query,
                rule.project_id.map(|id| id.to_string()),
                rule.attended,
                rule.weight,
                rule.is_enabled,
            ],
        )?;
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "id, user_id, query, project_id, attended, weight, is_enabled";

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<RuleRaw> {
    Ok(RuleRaw {
        id: row.get(0)?,
        user_id: row.get(1)?,
        query: row.get(2)?,
        project_id: row.get(3)?,
        attended: row.get(4)?,
        weight: row.get(5)?,
        is_enabled: row.get(6)?,
    })
}

struct RuleRaw {
    id: String,
    user_id: String,
    query: String,
    project_id: Option<String>,
    attended: Option<bool>,
    weight: f64,
    is_enabled: bool,
}

impl RuleRaw {
    fn into_domain(self) -> Result<ClassificationRule> {
        Ok(ClassificationRule {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            query: self.query,
            project_id: parse_opt_uuid(self.project_id)?,
            attended: self.attended,
            weight: self.weight,
            is_enabled: self.is_enabled,
        })
    }
}

#[async_trait]
impl RuleRepository for SqliteRuleRepository {
    async fn list_enabled(&self, user_id: Uuid) -> Result<Vec<ClassificationRule>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM classification_rules WHERE user_id = ?1 AND is_enabled = 1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_rule)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_domain()?);
        }
        Ok(out)
    }
}
