//! SQLCipher connection wrapper.

use std::ops::{Deref, DerefMut};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection as RusqliteConnection, Row, Statement as RusqliteStatement, ToSql};
use tracing::instrument;

use crate::storage::error::{StorageError, StorageResult};

/// Pooled rusqlite connection. Derefs to `rusqlite::Connection` for direct
/// use; the wrapper exists so callers outside this crate get `StorageError`
/// instead of `rusqlite::Error`.
pub struct SqlCipherConnection {
    inner: PooledConnection<SqliteConnectionManager>,
}

impl SqlCipherConnection {
    pub fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { inner: conn }
    }

    pub fn inner(&self) -> &RusqliteConnection {
        &self.inner
    }

    /// # Errors
    /// Returns an error if the query fails or returns no rows.
    #[instrument(skip(self, params, f), fields(sql = %sql))]
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<T>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        self.inner.query_row(sql, params, f).map_err(StorageError::from)
    }

    /// # Errors
    /// Returns an error if the statement fails to prepare.
    #[instrument(skip(self), fields(sql = %sql))]
    pub fn prepare(&self, sql: &str) -> StorageResult<SqlCipherStatement<'_>> {
        let stmt = self.inner.prepare(sql).map_err(StorageError::from)?;
        Ok(SqlCipherStatement::new(stmt))
    }

    /// # Errors
    /// Returns an error if the statement fails to execute.
    #[instrument(skip(self, params), fields(sql = %sql))]
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(sql, params).map_err(StorageError::from)
    }

    /// # Errors
    /// Returns an error if the pragma fails to apply.
    #[instrument(skip(self), fields(timeout_ms = %timeout_ms))]
    pub fn busy_timeout(&self, timeout_ms: u64) -> StorageResult<()> {
        self.inner
            .busy_timeout(std::time::Duration::from_millis(timeout_ms))
            .map_err(StorageError::from)
    }
}

impl Deref for SqlCipherConnection {
    type Target = RusqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SqlCipherConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Prepared statement wrapper mirroring [`SqlCipherConnection`]'s error type.
pub struct SqlCipherStatement<'conn> {
    inner: RusqliteStatement<'conn>,
}

impl<'conn> SqlCipherStatement<'conn> {
    pub fn new(stmt: RusqliteStatement<'conn>) -> Self {
        Self { inner: stmt }
    }

    /// # Errors
    /// Returns an error if the statement fails to execute.
    pub fn execute(&mut self, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(params).map_err(StorageError::from)
    }

    /// # Errors
    /// Returns an error if the query or row mapping fails.
    pub fn query_map<T, F>(&mut self, params: &[&dyn ToSql], mut f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        let rows = self.inner.query_map(params, |row| f(row)).map_err(StorageError::from)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::sqlcipher::{SqlCipherPool, SqlCipherPoolConfig};

    fn test_key() -> String {
        "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string()
    }

    #[test]
    fn connection_execute_inserts_row() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = SqlCipherPoolConfig::default();
        let pool = SqlCipherPool::new(&db_path, test_key(), config).unwrap();
        let conn = pool.get_sqlcipher_connection().unwrap();

        conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)", &[]).unwrap();
        let name = "Alice";
        let result = conn.execute("INSERT INTO test (name) VALUES (?)", &[&name]);
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn connection_query_row_reads_back_value() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = SqlCipherPoolConfig::default();
        let pool = SqlCipherPool::new(&db_path, test_key(), config).unwrap();
        let conn = pool.get_sqlcipher_connection().unwrap();

        conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)", &[]).unwrap();
        let name = "Bob";
        conn.execute("INSERT INTO test (name) VALUES (?)", &[&name]).unwrap();

        let result: String =
            conn.query_row("SELECT name FROM test WHERE id = ?", &[&1], |row| row.get(0)).unwrap();
        assert_eq!(result, "Bob");
    }

    #[test]
    fn prepared_statement_executes_multiple_times() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = SqlCipherPoolConfig::default();
        let pool = SqlCipherPool::new(&db_path, test_key(), config).unwrap();
        let conn = pool.get_sqlcipher_connection().unwrap();

        conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)", &[]).unwrap();
        let mut stmt = conn.prepare("INSERT INTO test (name) VALUES (?)").unwrap();

        let name1 = "Charlie";
        stmt.execute(&[&name1]).unwrap();
        let name2 = "Diana";
        stmt.execute(&[&name2]).unwrap();

        let count: i32 =
            conn.query_row("SELECT COUNT(*) FROM test", &[], |row| row.get(0)).unwrap();
        assert_eq!(count, 2);
    }
}
