//! Connection pool and blocking-task bridge.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};
use crate::schema;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const FILE_POOL_SIZE: u32 = 8;

/// Handle to the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("max_size", &self.pool.max_size())
            .finish()
    }
}

impl Database {
    /// Open (creating if needed) a database file, or memory for `:memory:`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_PATH {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|c| {
            c.execute_batch(
                "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder().max_size(FILE_POOL_SIZE).build(manager)?;
        tracing::info!("Opened database {}", path.display());
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// Every in-memory SQLite connection is its own database, so the pool
    /// holds exactly one connection and never recycles it.
    pub fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Ok(Self { pool })
    }

    /// Open and migrate in one step.
    pub fn open_migrated(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Self::open(path)?;
        db.migrate()?;
        Ok(db)
    }

    /// Apply pending schema migrations.
    pub fn migrate(&self) -> StoreResult<usize> {
        self.with_conn(schema::apply_migrations)
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` on a pooled connection in the current thread.
    pub fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn()?;
        f(&conn)
    }

    /// Run `f` on a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task {
            reason: e.to_string(),
        })?
    }

    /// Number of companies stored, regardless of visibility.
    pub fn company_count(&self) -> StoreResult<i64> {
        self.with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_database_is_shared_across_checkouts() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.with_conn(|c| {
            c.execute(
                "INSERT INTO companies (id, ticker, name, sector, industry) VALUES ('1', 'T', 'T', 'S', 'I')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.company_count().unwrap(), 1);
    }

    #[test]
    fn test_open_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("findata.db");
        let db = Database::open_migrated(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.company_count().unwrap(), 0);
    }

    #[test]
    fn test_memory_path_alias() {
        let db = Database::open_migrated(MEMORY_PATH).unwrap();
        assert_eq!(db.company_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_on_blocking_pool() {
        let db = Database::open_migrated(MEMORY_PATH).unwrap();
        let n = db
            .run(|c| Ok(c.query_row("SELECT 40 + 2", [], |r| r.get::<_, i64>(0))?))
            .await
            .unwrap();
        assert_eq!(n, 42);
    }
}
