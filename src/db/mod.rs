mod settings;

use directories::ProjectDirs;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::KnowledgeError;

pub use settings::{get_setting, set_setting};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "KbIngest";
const APPLICATION: &str = "KbIngest";
const DB_FILE_NAME: &str = "settings.db";

pub type StorageResult<T> = Result<T, KnowledgeError>;

pub fn init_storage() -> StorageResult<()> {
    with_connection(|_| Ok(()))
}

fn with_connection<T, F>(operation: F) -> StorageResult<T>
where
    F: FnOnce(&Connection) -> StorageResult<T>,
{
    let conn = open_connection()?;
    operation(&conn)
}

fn open_connection() -> StorageResult<Connection> {
    let path = database_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| {
            KnowledgeError::Storage(format!("failed to create database directory {dir:?}: {e}"))
        })?;
    }

    let conn = Connection::open(path)
        .map_err(|e| KnowledgeError::Storage(format!("failed to open SQLite database: {e}")))?;
    apply_migrations(&conn)?;
    Ok(conn)
}

fn apply_migrations(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(settings::SETTINGS_TABLE_SCHEMA)
        .map_err(|e| {
            KnowledgeError::Storage(format!("failed to initialize database schema: {e}"))
        })?;
    Ok(())
}

fn database_path() -> StorageResult<PathBuf> {
    let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
        KnowledgeError::Storage("failed to resolve application data directory".to_string())
    })?;
    Ok(dirs.data_dir().join(DB_FILE_NAME))
}

pub(crate) fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
