//! Persistence ports and their adapters.
//!
//! The engine never touches storage; [`crate::service::HabitTracker`] loads a
//! user aggregate through these traits and writes results back with
//! [`ScheduleStore::save_schedule`].

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, LoggingConfig, ReportConfig, StorageConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};
use crate::model::{Event, EventId, Habit, User, UserSettings};

/// Users and their settings.
pub trait UserRepo {
    fn create_user(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError>;
    fn user_exists(&self, name: &str) -> Result<bool, StorageError>;
    fn load_settings(&self, name: &str) -> Result<Option<UserSettings>, StorageError>;
    fn save_settings(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError>;
    /// Removes the user with all events and habits. Returns `false` if absent.
    fn delete_user(&self, name: &str) -> Result<bool, StorageError>;
    fn list_users(&self) -> Result<Vec<String>, StorageError>;
}

/// Normalized calendar events.
pub trait EventRepo {
    /// Events in insertion order.
    fn load_events(&self, user: &str) -> Result<Vec<Event>, StorageError>;
    fn add_event(&self, event: &Event) -> Result<(), StorageError>;
    fn delete_event(&self, user: &str, id: EventId) -> Result<bool, StorageError>;
    fn replace_events(&self, user: &str, events: &[Event]) -> Result<(), StorageError>;
}

/// Habits together with their assigned occurrences.
pub trait HabitRepo {
    /// Habits in stored order, which is creation order.
    fn load_habits(&self, user: &str) -> Result<Vec<Habit>, StorageError>;
    fn replace_habits(&self, user: &str, habits: &[Habit]) -> Result<(), StorageError>;
    fn delete_habit(&self, user: &str, name: &str) -> Result<bool, StorageError>;
    fn delete_habits(&self, user: &str) -> Result<usize, StorageError>;
}

/// What a single schedule write replaces. Habits are always replaced.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleUpdate<'a> {
    pub settings: Option<&'a UserSettings>,
    pub events: Option<&'a [Event]>,
    pub habits: &'a [Habit],
}

impl<'a> ScheduleUpdate<'a> {
    pub fn habits(habits: &'a [Habit]) -> Self {
        Self {
            settings: None,
            events: None,
            habits,
        }
    }

    /// Full snapshot of a user aggregate.
    pub fn user(user: &'a User) -> Self {
        Self {
            settings: Some(&user.settings),
            events: Some(user.events.as_slice()),
            habits: &user.habits,
        }
    }
}

/// Everything the application service needs from storage.
pub trait ScheduleStore: UserRepo + EventRepo + HabitRepo {
    /// Writes the update all-or-nothing.
    fn save_schedule(&self, user: &str, update: ScheduleUpdate<'_>) -> Result<(), StorageError>;

    /// Loads the full aggregate, `None` if the user does not exist.
    fn load_user(&self, name: &str) -> Result<Option<User>, StorageError> {
        let Some(settings) = self.load_settings(name)? else {
            return Ok(None);
        };
        Ok(Some(User {
            name: name.to_string(),
            settings,
            events: self.load_events(name)?,
            habits: self.load_habits(name)?,
        }))
    }
}

/// Returns the habitweek data directory, creating it if needed.
///
/// `HABITWEEK_DATA_DIR` wins when set. Otherwise `~/.config/habitweek`, or
/// `~/.config/habitweek-dev` with `HABITWEEK_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HABITWEEK_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("HABITWEEK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitweek-dev")
            } else {
                base_dir.join("habitweek")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
