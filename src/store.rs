//! Local persistence
//!
//! Holds the stable device identifier, the cached tutor settings, the last
//! call result and a rolling call history capped at [`HISTORY_LIMIT`] rows.

mod schema;

pub use schema::HISTORY_LIMIT;
use schema::{KEY_DEVICE_ID, KEY_LAST_CALL_RESULT, KEY_TUTOR_SETTINGS, SCHEMA};

use crate::session::{CallRecord, HistoryEntry};
use crate::settings::StoredSettings;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt stored value: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe handle to the local database
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ==================== Key/value records ====================

    fn get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> StoreResult<Option<T>> {
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(StoreError::from)
    }

    fn put_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Stable per-device identifier, generated on first use
    pub fn device_id(&self) -> StoreResult<String> {
        let conn = self.conn()?;
        if let Some(id) = Self::get_json::<String>(&conn, KEY_DEVICE_ID)? {
            return Ok(id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        Self::put_json(&conn, KEY_DEVICE_ID, &id)?;
        tracing::info!(device_id = %id, "Generated device id");
        Ok(id)
    }

    pub fn cached_settings(&self) -> StoreResult<Option<StoredSettings>> {
        let conn = self.conn()?;
        Self::get_json(&conn, KEY_TUTOR_SETTINGS)
    }

    pub fn cache_settings(&self, settings: &StoredSettings) -> StoreResult<()> {
        let conn = self.conn()?;
        Self::put_json(&conn, KEY_TUTOR_SETTINGS, settings)
    }

    pub fn last_call(&self) -> StoreResult<Option<CallRecord>> {
        let conn = self.conn()?;
        Self::get_json(&conn, KEY_LAST_CALL_RESULT)
    }

    // ==================== Call history ====================

    /// Store `record` as the last call result and prepend its history entry,
    /// dropping entries beyond the cap. Both writes commit together.
    pub fn record_call(&self, record: &CallRecord) -> StoreResult<HistoryEntry> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let entry = record.history_entry();

        Self::put_json(&tx, KEY_LAST_CALL_RESULT, record)?;
        tx.execute(
            "INSERT INTO call_history (session_id, entry, created_at) VALUES (?1, ?2, ?3)",
            params![
                entry.session_id,
                serde_json::to_string(&entry)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        #[allow(clippy::cast_possible_wrap)]
        let limit = HISTORY_LIMIT as i64;
        tx.execute(
            "DELETE FROM call_history WHERE id NOT IN
             (SELECT id FROM call_history ORDER BY id DESC LIMIT ?1)",
            params![limit],
        )?;
        tx.commit()?;

        Ok(entry)
    }

    /// History entries, newest first
    pub fn history(&self) -> StoreResult<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT entry FROM call_history ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for raw in rows {
            entries.push(serde_json::from_str(&raw?)?);
        }
        Ok(entries)
    }
}
