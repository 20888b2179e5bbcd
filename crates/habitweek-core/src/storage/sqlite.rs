//! SQLite-backed schedule store.
//!
//! One row per user, event and habit; habit windows, occurrences and banned
//! windows live in child tables keyed by position. Every multi-row write runs
//! inside a single transaction.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{migrations, EventRepo, HabitRepo, ScheduleStore, ScheduleUpdate, UserRepo};
use crate::error::StorageError;
use crate::model::{Event, EventId, Habit, Occurrence, Placement, Recurrence, UserSettings};
use crate::time::{day_index, ClockTime, TimeInterval, WEEK};

/// SQLite database holding users, calendars and habits.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

// === Row conversion ===

fn invalid(what: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::InvalidData(format!("{what}: {err}"))
}

fn interval_from_minutes(start: u16, end: u16) -> Result<TimeInterval, StorageError> {
    let start = ClockTime::from_minutes(start).map_err(|e| invalid("interval", e))?;
    let end = ClockTime::from_minutes(end).map_err(|e| invalid("interval", e))?;
    TimeInterval::new(start, end).map_err(|e| invalid("interval", e))
}

fn format_recurrence(recurrence: &Recurrence) -> (&'static str, String) {
    match recurrence {
        Recurrence::Once(date) => ("once", date.to_string()),
        Recurrence::Weekly(day) => ("weekly", day.to_string()),
        Recurrence::BiWeekly(date) => ("bi_weekly", date.to_string()),
    }
}

fn parse_recurrence(kind: &str, on: &str) -> Result<Recurrence, StorageError> {
    let date = || on.parse::<NaiveDate>().map_err(|e| invalid("recurrence date", e));
    match kind {
        "once" => Ok(Recurrence::Once(date()?)),
        "weekly" => on
            .parse::<Weekday>()
            .map(Recurrence::Weekly)
            .map_err(|_| invalid("recurrence day", on)),
        "bi_weekly" => Ok(Recurrence::BiWeekly(date()?)),
        other => Err(invalid("recurrence kind", other)),
    }
}

fn parse_placement(policy: &str, windows: Vec<TimeInterval>) -> Result<Placement, StorageError> {
    match policy {
        "free" => Ok(Placement::Free),
        "preferred" => Ok(Placement::Preferred(windows)),
        "fixed" => Ok(Placement::Fixed(windows)),
        other => Err(invalid("placement policy", other)),
    }
}

fn parse_day(index: u8) -> Result<Weekday, StorageError> {
    WEEK.get(index as usize)
        .copied()
        .ok_or_else(|| invalid("occurrence day", index))
}

// === Reads ===

fn read_intervals(conn: &Connection, sql: &str, key: &str) -> Result<Vec<TimeInterval>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![key], |row| Ok((row.get::<_, u16>(0)?, row.get::<_, u16>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(start, end)| interval_from_minutes(start, end))
        .collect()
}

fn read_occurrences(conn: &Connection, habit_id: &str) -> Result<Vec<Occurrence>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT day, start_min, end_min FROM occurrences
         WHERE habit_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![habit_id], |row| {
            Ok((row.get::<_, u8>(0)?, row.get::<_, u16>(1)?, row.get::<_, u16>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(day, start, end)| {
            Ok(Occurrence {
                day: parse_day(day)?,
                interval: interval_from_minutes(start, end)?,
            })
        })
        .collect()
}

struct HabitRow {
    id: String,
    name: String,
    minutes: u16,
    policy: String,
    times_per_week: u32,
    created_at: String,
}

fn read_habits(conn: &Connection, user: &str) -> Result<Vec<Habit>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, minutes, policy, times_per_week, created_at
         FROM habits WHERE user_name = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![user], |row| {
            Ok(HabitRow {
                id: row.get(0)?,
                name: row.get(1)?,
                minutes: row.get(2)?,
                policy: row.get(3)?,
                times_per_week: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut habits = Vec::with_capacity(rows.len());
    for row in rows {
        let windows = read_intervals(
            conn,
            "SELECT start_min, end_min FROM habit_windows WHERE habit_id = ?1 ORDER BY position",
            &row.id,
        )?;
        let habit = Habit {
            id: Uuid::parse_str(&row.id).map_err(|e| invalid("habit id", e))?,
            occurrences: read_occurrences(conn, &row.id)?,
            placement: parse_placement(&row.policy, windows)?,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| invalid("habit created_at", e))?
                .with_timezone(&Utc),
            name: row.name,
            user: user.to_string(),
            minutes: row.minutes,
            times_per_week: row.times_per_week,
        };
        habit.validate().map_err(|e| invalid("habit", e))?;
        habits.push(habit);
    }
    Ok(habits)
}

fn read_events(conn: &Connection, user: &str) -> Result<Vec<Event>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, start_min, end_min, recurrence, recurrence_on
         FROM events WHERE user_name = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![user], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u16>(2)?,
                row.get::<_, u16>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, start, end, kind, on)| {
            let id = Uuid::parse_str(&id).map_err(|e| invalid("event id", e))?;
            let recurrence = parse_recurrence(&kind, &on)?;
            Event::with_id(id, name, user, interval_from_minutes(start, end)?, recurrence)
                .map_err(|e| invalid("event", e))
        })
        .collect()
}

// === Writes ===

fn write_settings(conn: &Connection, user: &str, settings: &UserSettings) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE users SET notify_on = ?2 WHERE name = ?1",
        params![user, settings.notify_on],
    )?;
    conn.execute("DELETE FROM banned_windows WHERE user_name = ?1", params![user])?;
    let mut stmt = conn.prepare(
        "INSERT INTO banned_windows (user_name, position, start_min, end_min)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, window) in settings.banned_windows.iter().enumerate() {
        stmt.execute(params![
            user,
            position,
            window.start().minutes(),
            window.end().minutes()
        ])?;
    }
    Ok(())
}

fn insert_event(conn: &Connection, event: &Event, position: i64) -> Result<(), StorageError> {
    let (kind, on) = format_recurrence(&event.recurrence);
    conn.execute(
        "INSERT INTO events (id, user_name, name, start_min, end_min, recurrence, recurrence_on, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.id.to_string(),
            event.user,
            event.name,
            event.interval.start().minutes(),
            event.interval.end().minutes(),
            kind,
            on,
            position
        ],
    )?;
    Ok(())
}

fn write_events(conn: &Connection, user: &str, events: &[Event]) -> Result<(), StorageError> {
    conn.execute("DELETE FROM events WHERE user_name = ?1", params![user])?;
    for (position, event) in events.iter().enumerate() {
        insert_event(conn, event, position as i64)?;
    }
    Ok(())
}

fn delete_habit_rows(conn: &Connection, filter: &str, key: &str) -> Result<usize, StorageError> {
    conn.execute(
        &format!("DELETE FROM habit_windows WHERE habit_id IN (SELECT id FROM habits WHERE {filter})"),
        params![key],
    )?;
    conn.execute(
        &format!("DELETE FROM occurrences WHERE habit_id IN (SELECT id FROM habits WHERE {filter})"),
        params![key],
    )?;
    Ok(conn.execute(&format!("DELETE FROM habits WHERE {filter}"), params![key])?)
}

fn write_habits(conn: &Connection, user: &str, habits: &[Habit]) -> Result<(), StorageError> {
    delete_habit_rows(conn, "user_name = ?1", user)?;

    let mut insert_habit = conn.prepare(
        "INSERT INTO habits (id, user_name, name, minutes, policy, times_per_week, created_at, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut insert_window = conn.prepare(
        "INSERT INTO habit_windows (habit_id, position, start_min, end_min) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut insert_occurrence = conn.prepare(
        "INSERT INTO occurrences (habit_id, position, day, start_min, end_min)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for (position, habit) in habits.iter().enumerate() {
        let id = habit.id.to_string();
        insert_habit.execute(params![
            id,
            user,
            habit.name,
            habit.minutes,
            habit.placement.name(),
            habit.times_per_week,
            habit.created_at.to_rfc3339(),
            position
        ])?;
        for (i, window) in habit.placement.windows().iter().enumerate() {
            insert_window.execute(params![id, i, window.start().minutes(), window.end().minutes()])?;
        }
        for (i, occurrence) in habit.occurrences.iter().enumerate() {
            insert_occurrence.execute(params![
                id,
                i,
                day_index(occurrence.day),
                occurrence.interval.start().minutes(),
                occurrence.interval.end().minutes()
            ])?;
        }
    }
    Ok(())
}

// === Ports ===

impl UserRepo for SqliteStore {
    fn create_user(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (name, notify_on, created_at) VALUES (?1, ?2, ?3)",
            params![name, settings.notify_on, Utc::now().to_rfc3339()],
        )?;
        write_settings(&tx, name, settings)?;
        tx.commit()?;
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?)
    }

    fn load_settings(&self, name: &str) -> Result<Option<UserSettings>, StorageError> {
        let notify_on: Option<bool> = self
            .conn
            .query_row(
                "SELECT notify_on FROM users WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(notify_on) = notify_on else {
            return Ok(None);
        };
        let banned_windows = read_intervals(
            &self.conn,
            "SELECT start_min, end_min FROM banned_windows WHERE user_name = ?1 ORDER BY position",
            name,
        )?;
        Ok(Some(UserSettings {
            notify_on,
            banned_windows,
        }))
    }

    fn save_settings(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        write_settings(&tx, name, settings)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_user(&self, name: &str) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        delete_habit_rows(&tx, "user_name = ?1", name)?;
        tx.execute("DELETE FROM events WHERE user_name = ?1", params![name])?;
        tx.execute("DELETE FROM banned_windows WHERE user_name = ?1", params![name])?;
        let deleted = tx.execute("DELETE FROM users WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn list_users(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT name FROM users ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl EventRepo for SqliteStore {
    fn load_events(&self, user: &str) -> Result<Vec<Event>, StorageError> {
        read_events(&self.conn, user)
    }

    fn add_event(&self, event: &Event) -> Result<(), StorageError> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM events WHERE user_name = ?1",
            params![event.user],
            |row| row.get(0),
        )?;
        insert_event(&self.conn, event, next)
    }

    fn delete_event(&self, user: &str, id: EventId) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            "DELETE FROM events WHERE user_name = ?1 AND id = ?2",
            params![user, id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn replace_events(&self, user: &str, events: &[Event]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        write_events(&tx, user, events)?;
        tx.commit()?;
        Ok(())
    }
}

impl HabitRepo for SqliteStore {
    fn load_habits(&self, user: &str) -> Result<Vec<Habit>, StorageError> {
        read_habits(&self.conn, user)
    }

    fn replace_habits(&self, user: &str, habits: &[Habit]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        write_habits(&tx, user, habits)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_habit(&self, user: &str, name: &str) -> Result<bool, StorageError> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM habits WHERE user_name = ?1 AND name = ?2",
                params![user, name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(id) = id else {
            return Ok(false);
        };
        let tx = self.conn.unchecked_transaction()?;
        let deleted = delete_habit_rows(&tx, "id = ?1", &id)?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn delete_habits(&self, user: &str) -> Result<usize, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = delete_habit_rows(&tx, "user_name = ?1", user)?;
        tx.commit()?;
        Ok(deleted)
    }
}

impl ScheduleStore for SqliteStore {
    fn save_schedule(&self, user: &str, update: ScheduleUpdate<'_>) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        if let Some(settings) = update.settings {
            write_settings(&tx, user, settings)?;
        }
        if let Some(events) = update.events {
            write_events(&tx, user, events)?;
        }
        write_habits(&tx, user, update.habits)?;
        tx.commit()?;
        debug!(user, habits = update.habits.len(), "saved schedule");
        Ok(())
    }
}
