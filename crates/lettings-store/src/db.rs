//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use lettings_core::config::StoreConfig;
use lettings_core::error::LettingsError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database described by a [`StoreConfig`].
    ///
    /// `:memory:` opens a private in-memory database; anything else is a
    /// directory (with `~` expanded) holding `<name>.db`.
    pub fn open(config: &StoreConfig) -> Result<Self, LettingsError> {
        if config.is_in_memory() {
            return Self::in_memory();
        }
        let path = resolve_dir(&config.uri).join(format!("{}.db", config.name));
        Self::new(&path)
    }

    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, and runs all pending
    /// migrations.
    pub fn new(path: &Path) -> Result<Self, LettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| LettingsError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16384;",
        )
        .map_err(|e| LettingsError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing and throwaway runs).
    pub fn in_memory() -> Result<Self, LettingsError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LettingsError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, LettingsError>
    where
        F: FnOnce(&Connection) -> Result<T, LettingsError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LettingsError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn resolve_dir(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("~/").or_else(|| dir.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(|e| LettingsError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database_has_collections() {
        let db = Database::in_memory().unwrap();
        assert_eq!(count(&db, "properties"), 0);
        assert_eq!(count(&db, "residents"), 0);
    }

    #[test]
    fn test_open_from_config_creates_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            uri: dir.path().to_string_lossy().to_string(),
            name: "lettings_test".to_string(),
            seed_sample_data: false,
        };
        let db = Database::open(&config).unwrap();
        assert_eq!(count(&db, "properties"), 0);
        assert!(dir.path().join("lettings_test.db").exists());
    }

    #[test]
    fn test_open_in_memory_from_config() {
        let config = StoreConfig {
            uri: ":memory:".to_string(),
            ..StoreConfig::default()
        };
        let db = Database::open(&config).unwrap();
        assert_eq!(count(&db, "residents"), 0);
    }

    #[test]
    fn test_resolve_dir_plain_path_untouched() {
        assert_eq!(resolve_dir("/var/lib/lettings"), PathBuf::from("/var/lib/lettings"));
    }

    #[test]
    fn test_resolve_dir_expands_home() {
        let resolved = resolve_dir("~/.lettings/data");
        assert!(resolved.ends_with(".lettings/data"));
        assert!(!resolved.starts_with("~"));
    }
}
