//! SQLCipher-backed `ConnectionRepository`.
//!
//! Access and refresh tokens are encrypted at rest with
//! [`chronarc_common::crypto::EncryptionService`] before they reach the
//! database, on top of the whole-database SQLCipher encryption: a leaked
//! backup file or a `PRAGMA key`-less connection still can't recover a
//! usable bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use chronarc_common::crypto::EncryptionService;
use chronarc_core::ports::ConnectionRepository;
use chronarc_domain::types::calendar::CalendarConnection;
use chronarc_domain::{ChronarcError, Result};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{parse_datetime, parse_opt_datetime, parse_uuid, DbPool};

pub struct SqliteConnectionRepository {
    pool: DbPool,
    encryption: Arc<EncryptionService>,
}

impl SqliteConnectionRepository {
    #[must_use]
    pub fn new(pool: DbPool, encryption: Arc<EncryptionService>) -> Self {
        Self { pool, encryption }
    }

    fn encrypt(&self, token: &str) -> Result<String> {
        self.encryption
            .encrypt_to_string(token.as_bytes())
            .map_err(|e| ChronarcError::Internal(format!("failed to encrypt token: {e}")))
    }

    fn decrypt(&self, token: &str) -> Result<String> {
        let bytes = self
            .encryption
            .decrypt_from_string(token)
            .map_err(|e| ChronarcError::Internal(format!("failed to decrypt token: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| ChronarcError::Internal(format!("decrypted token is not valid UTF-8: {e}")))
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, provider, access_token, refresh_token, token_expires_at, last_synced_at, created_at";

fn row_to_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConnectionRaw> {
    Ok(ConnectionRaw {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider: row.get(2)?,
        access_token: row.get(3)?,
        refresh_token: row.get(4)?,
        token_expires_at: row.get(5)?,
        last_synced_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

struct ConnectionRaw {
    id: String,
    user_id: String,
    provider: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: String,
    last_synced_at: Option<String>,
    created_at: String,
}

impl ConnectionRaw {
    fn into_domain(self, repo: &SqliteConnectionRepository) -> Result<CalendarConnection> {
        Ok(CalendarConnection {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            provider: self.provider,
            access_token: repo.decrypt(&self.access_token)?,
            refresh_token: repo.decrypt(&self.refresh_token)?,
            token_expires_at: parse_datetime(&self.token_expires_at)?,
            last_synced_at: parse_opt_datetime(self.last_synced_at)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

#[async_trait]
impl ConnectionRepository for SqliteConnectionRepository {
    async fn get(&self, connection_id: Uuid) -> Result<Option<CalendarConnection>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM calendar_connections WHERE id = ?1");
        let raw = conn
            .query_row(&sql, params![connection_id.to_string()], row_to_connection)
            .optional()?;
        raw.map(|r| r.into_domain(self)).transpose()
    }

    async fn save(&self, connection: &CalendarConnection) -> Result<()> {
        let access_token = self.encrypt(&connection.access_token)?;
        let refresh_token = self.encrypt(&connection.refresh_token)?;

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO calendar_connections (id, user_id, provider, access_token, refresh_token, \
             token_expires_at, last_synced_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT (id) DO UPDATE SET access_token = excluded.access_token, \
             refresh_token = excluded.refresh_token, token_expires_at = excluded.token_expires_at, \
             last_synced_at = excluded.last_synced_at",
            params![
                connection.id.to_string(),
                connection.user_id.to_string(),
                connection.provider,
                access_token,
                refresh_token,
                connection.token_expires_at.to_rfc3339(),
                connection.last_synced_at.map(|dt| dt.to_rfc3339()),
                connection.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn mark_all_calendars_needs_reauth(&self, connection_id: Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE calendars SET needs_reauth = 1 WHERE connection_id = ?1",
            params![connection_id.to_string()],
        )?;
        Ok(())
    }
}
