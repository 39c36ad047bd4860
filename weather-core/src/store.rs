//! SQLite-backed local store.
//!
//! Connections come from an r2d2 pool; every query runs on the blocking
//! thread pool so callers stay async.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::{path::Path, sync::Arc};
use tokio::task;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub mod location;
pub mod weather;

pub use location::LocationStore;
pub use weather::WeatherStore;

type ConnectionPool = Pool<SqliteConnectionManager>;

const DEFAULT_POOL_SIZE: u32 = 4;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS locations (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        city          TEXT    NOT NULL UNIQUE COLLATE NOCASE,
        latitude      REAL    NOT NULL,
        longitude     REAL    NOT NULL,
        time_zone     TEXT    NOT NULL,
        is_current    INTEGER NOT NULL DEFAULT 0,
        from_position INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_locations_coordinate ON locations (latitude, longitude);

    CREATE TABLE IF NOT EXISTS daily_weather (
        location_id     INTEGER NOT NULL REFERENCES locations (id) ON DELETE CASCADE,
        time            TEXT    NOT NULL,
        temperature_max REAL    NOT NULL,
        temperature_min REAL    NOT NULL,
        wind_speed      REAL    NOT NULL,
        pressure        REAL,
        weather_code    INTEGER NOT NULL,
        PRIMARY KEY (location_id, time)
    );

    CREATE TABLE IF NOT EXISTS hourly_weather (
        location_id  INTEGER NOT NULL REFERENCES locations (id) ON DELETE CASCADE,
        time         TEXT    NOT NULL,
        temperature  REAL    NOT NULL,
        wind_speed   REAL    NOT NULL,
        pressure     REAL    NOT NULL,
        weather_code INTEGER NOT NULL,
        PRIMARY KEY (location_id, time)
    );
";

/// Handle to the local database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Arc<ConnectionPool>,
}

impl Database {
    /// Open (or create) the database file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Opening local store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(init_connection);
        let pool = Pool::builder().max_size(DEFAULT_POOL_SIZE).build(manager)?;
        Self::from_pool(pool)
    }

    /// Private in-memory database; a single pooled connection keeps it alive.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: ConnectionPool) -> Result<Self> {
        pool.get()?.execute_batch(SCHEMA)?;
        debug!("Local store schema ready");
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn locations(&self) -> LocationStore {
        LocationStore::new(self.clone())
    }

    pub fn weather(&self) -> WeatherStore {
        WeatherStore::new(self.clone())
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let db = Database::open_in_memory().expect("open");
        let tables: i64 = db
            .run(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('locations', 'daily_weather', 'hourly_weather')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .expect("query");

        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn file_database_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("weather.db");

        let db = Database::open(&path).expect("open");
        assert!(path.exists());

        // Reopening runs the idempotent schema again.
        drop(db);
        assert!(Database::open(&path).is_ok());
    }
}
