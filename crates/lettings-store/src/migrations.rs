//! Database schema migrations.
//!
//! Each collection is a table of JSON documents keyed by the entity id, with
//! the creation time kept in its own column for newest-first ordering.

use rusqlite::Connection;
use tracing::info;

use lettings_core::error::LettingsError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), LettingsError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| LettingsError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| LettingsError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: document_collections");
    }

    Ok(())
}

/// Version 1: property and resident collections.
fn apply_v1(conn: &Connection) -> Result<(), LettingsError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS properties (
            id          TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL CHECK (json_valid(doc)),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_properties_created
            ON properties (created_at DESC);

        CREATE TABLE IF NOT EXISTS residents (
            id          TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL CHECK (json_valid(doc)),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_residents_created
            ON residents (created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_residents_property
            ON residents (json_extract(doc, '$.currentTenancy.propertyId'));

        INSERT INTO schema_migrations (version, name) VALUES (1, 'document_collections');
        ",
    )
    .map_err(|e| LettingsError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
