//! SQLite Flag Store
//!
//! Implements ResolutionFlagStore on a SQLite file, so a pending resolution
//! flow is remembered across process restarts.

use crate::domain::ports::ResolutionFlagStore;
use crate::error::StoreError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed resolution flag store.
pub struct SqliteFlagStore {
    conn: Mutex<Connection>,
}

impl SqliteFlagStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS resolution_flags (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
             )",
            [],
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn now_secs() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl ResolutionFlagStore for SqliteFlagStore {
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError> {
        let conn = self.conn.lock();
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM resolution_flags WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(value.map(|v| v != 0))
    }

    fn set(&self, key: &str, value: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO resolution_flags (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value as i64, Self::now_secs()],
        )
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }
}
