mod schema;

use anyhow::{anyhow, Context, Result};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use schema::TABLES;

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, duckdb::Error>;
}

impl<T> OptionalExt<T> for Result<T, duckdb::Error> {
    fn optional(self) -> Result<Option<T>, duckdb::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Storage handle lent to the migrator. One connection, no pooling.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Create any of the four tables that do not exist yet.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        for (table, sql) in TABLES {
            tracing::debug!("Ensuring table: {}", table);
            conn.execute_batch(sql)
                .with_context(|| format!("Failed to create table {table}"))?;
        }

        Ok(())
    }

    pub fn execute<P: duckdb::Params>(&self, sql: &str, params: P) -> Result<usize> {
        let conn = self.connection()?;
        Ok(conn.execute(sql, params)?)
    }

    pub fn query_one<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: duckdb::Params,
        F: FnOnce(&duckdb::Row<'_>) -> Result<T, duckdb::Error>,
    {
        let conn = self.connection()?;
        let result = conn.query_row(sql, params, f).optional()?;
        Ok(result)
    }

    /// Whether `table` already holds a row whose `column` equals `key`.
    ///
    /// `table` and `column` come from [`crate::models::Entity`], never from input.
    pub fn key_exists(&self, table: &str, column: &str, key: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {table} WHERE {column} = ? LIMIT 1");
        let found: Option<i32> = self
            .query_one(&sql, params![key], |row| row.get(0))
            .with_context(|| format!("Failed to look up {table}.{column} = {key:?}"))?;
        Ok(found.is_some())
    }

    pub fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: Option<i64> = self.query_one(&sql, [], |row| row.get(0))?;
        Ok(count.unwrap_or(0))
    }

    /// Run `f` inside one transaction. Commits if `f` succeeds, rolls back otherwise.
    pub fn execute_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;
        let value = f(&tx)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }
}
