//! Local database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS call_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    entry TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_call_history_created ON call_history(id DESC);
";

/// Maximum number of rows kept in `call_history`
pub const HISTORY_LIMIT: usize = 10;

pub const KEY_DEVICE_ID: &str = "device_id";
pub const KEY_TUTOR_SETTINGS: &str = "tutor_settings";
pub const KEY_LAST_CALL_RESULT: &str = "last_call_result";
