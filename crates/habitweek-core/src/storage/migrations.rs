//! Database schema migrations for habitweek.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
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
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: users, events, habits with their windows and occurrences.
///
/// Times are stored as minutes since midnight.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            name       TEXT PRIMARY KEY,
            notify_on  INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id            TEXT PRIMARY KEY,
            user_name     TEXT NOT NULL REFERENCES users(name) ON DELETE CASCADE,
            name          TEXT NOT NULL,
            start_min     INTEGER NOT NULL,
            end_min       INTEGER NOT NULL,
            recurrence    TEXT NOT NULL,
            recurrence_on TEXT NOT NULL,
            position      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id             TEXT PRIMARY KEY,
            user_name      TEXT NOT NULL REFERENCES users(name) ON DELETE CASCADE,
            name           TEXT NOT NULL,
            minutes        INTEGER NOT NULL,
            policy         TEXT NOT NULL,
            times_per_week INTEGER NOT NULL,
            created_at     TEXT NOT NULL,
            position       INTEGER NOT NULL,
            UNIQUE (user_name, name)
        );

        CREATE TABLE IF NOT EXISTS habit_windows (
            habit_id  TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            position  INTEGER NOT NULL,
            start_min INTEGER NOT NULL,
            end_min   INTEGER NOT NULL,
            PRIMARY KEY (habit_id, position)
        );

        CREATE TABLE IF NOT EXISTS occurrences (
            habit_id  TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            position  INTEGER NOT NULL,
            day       INTEGER NOT NULL,
            start_min INTEGER NOT NULL,
            end_min   INTEGER NOT NULL,
            PRIMARY KEY (habit_id, position)
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: banned windows in user settings, plus per-user lookup indexes.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS banned_windows (
            user_name TEXT NOT NULL REFERENCES users(name) ON DELETE CASCADE,
            position  INTEGER NOT NULL,
            start_min INTEGER NOT NULL,
            end_min   INTEGER NOT NULL,
            PRIMARY KEY (user_name, position)
        );

        CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_name, position);
        CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_name, position);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: event ids are unique per user, not per database.
///
/// SQLite cannot change a primary key in place, so the table is rebuilt.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE events_v3 (
            id            TEXT NOT NULL,
            user_name     TEXT NOT NULL REFERENCES users(name) ON DELETE CASCADE,
            name          TEXT NOT NULL,
            start_min     INTEGER NOT NULL,
            end_min       INTEGER NOT NULL,
            recurrence    TEXT NOT NULL,
            recurrence_on TEXT NOT NULL,
            position      INTEGER NOT NULL,
            PRIMARY KEY (user_name, id)
        );

        INSERT INTO events_v3
            SELECT id, user_name, name, start_min, end_min, recurrence, recurrence_on, position
            FROM events;

        DROP TABLE events;
        ALTER TABLE events_v3 RENAME TO events;
        CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_name, position);",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        // All tables exist.
        for table in ["users", "events", "habits", "habit_windows", "occurrences", "banned_windows"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (name, notify_on, created_at) VALUES ('egor', 1, '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        assert_eq!(get_schema_version(&conn), 1);

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        // Existing rows survive and the new table is usable.
        conn.execute(
            "INSERT INTO banned_windows (user_name, position, start_min, end_min) VALUES ('egor', 0, 720, 780)",
            [],
        )
        .unwrap();
        let users: i32 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn test_v3_keeps_events_and_scopes_ids_per_user() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (name, notify_on, created_at) VALUES ('egor', 1, '2024-01-01T00:00:00Z');
             INSERT INTO users (name, notify_on, created_at) VALUES ('anna', 1, '2024-01-01T00:00:00Z');
             INSERT INTO events VALUES ('e1', 'egor', 'Work', 540, 1080, 'weekly', 'Mon', 0);",
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 3);

        conn.execute(
            "INSERT INTO events VALUES ('e1', 'anna', 'Work', 540, 1080, 'weekly', 'Mon', 0)",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO events VALUES ('e1', 'anna', 'Gym', 600, 660, 'weekly', 'Tue', 1)",
            [],
        );
        assert!(duplicate.is_err());

        let events: i32 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(events, 2);
    }
}
