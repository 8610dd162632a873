//! Database schema migrations for the SQLite store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0)) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the four collections.
///
/// Every table carries an autoincrement `seq` so reads come back in insertion
/// order, and a unique text `id` used for lookups.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_slots (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            school_id     TEXT NOT NULL,
            class_id      TEXT NOT NULL,
            technician_id TEXT NOT NULL,
            activity      TEXT NOT NULL,
            weekday       INTEGER NOT NULL,
            start_time    TEXT NOT NULL,
            end_time      TEXT NOT NULL,
            valid_from    TEXT NOT NULL,
            valid_to      TEXT NOT NULL,
            active        INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS session_records (
            seq                    INTEGER PRIMARY KEY AUTOINCREMENT,
            id                     TEXT NOT NULL UNIQUE,
            slot_id                TEXT NOT NULL,
            date                   TEXT NOT NULL,
            status                 TEXT NOT NULL DEFAULT 'PLANNED',
            assigned_technician_id TEXT NOT NULL,
            attendee_count         INTEGER,
            summary                TEXT,
            incidents              TEXT,
            signed_off             INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS substitution_requests (
            seq                      INTEGER PRIMARY KEY AUTOINCREMENT,
            id                       TEXT NOT NULL UNIQUE,
            session_id               TEXT NOT NULL,
            origin_technician_id     TEXT NOT NULL,
            substitute_technician_id TEXT NOT NULL,
            status                   TEXT NOT NULL,
            reason                   TEXT NOT NULL,
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS audit_entries (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            actor_user_id TEXT NOT NULL,
            actor_email   TEXT NOT NULL,
            action        TEXT NOT NULL,
            entity_type   TEXT NOT NULL,
            entity_id     TEXT NOT NULL,
            description   TEXT NOT NULL,
            timestamp     TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: lookup indexes and append-only guards on the audit table.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_session_records_date ON session_records(date);
         CREATE INDEX IF NOT EXISTS idx_session_records_technician
             ON session_records(assigned_technician_id);
         CREATE INDEX IF NOT EXISTS idx_substitution_requests_session
             ON substitution_requests(session_id);
         CREATE INDEX IF NOT EXISTS idx_audit_entries_entity
             ON audit_entries(entity_type, entity_id);

         CREATE TRIGGER IF NOT EXISTS audit_entries_no_update
         BEFORE UPDATE ON audit_entries
         BEGIN
             SELECT RAISE(ABORT, 'audit entries are append-only');
         END;

         CREATE TRIGGER IF NOT EXISTS audit_entries_no_delete
         BEFORE DELETE ON audit_entries
         BEGIN
             SELECT RAISE(ABORT, 'audit entries are append-only');
         END;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
