use rusqlite::{params, Connection, OptionalExtension};

use super::{current_timestamp_millis, with_connection, StorageResult};
use crate::error::KnowledgeError;

pub(crate) const SETTINGS_TABLE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at_millis INTEGER NOT NULL
);";

pub fn get_setting(key: &str) -> StorageResult<Option<String>> {
    with_connection(|conn| read_setting(conn, key))
}

pub fn set_setting(key: &str, value: &str) -> StorageResult<()> {
    with_connection(|conn| write_setting(conn, key, value))
}

fn read_setting(conn: &Connection, key: &str) -> StorageResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|e| KnowledgeError::Storage(format!("failed to query setting {key}: {e}")))
}

fn write_setting(conn: &Connection, key: &str, value: &str) -> StorageResult<()> {
    let updated_at = current_timestamp_millis();
    conn.execute(
        "INSERT INTO settings (key, value, updated_at_millis) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at_millis = excluded.updated_at_millis",
        params![key, value, updated_at],
    )
    .map_err(|e| KnowledgeError::Storage(format!("failed to upsert setting {key}: {e}")))?;
    Ok(())
}
