//! Core error types for habitweek-core.
//!
//! Construction problems, engine invariant violations, storage failures and
//! configuration failures each get their own enum; `CoreError` wraps them for
//! the application service.

use std::path::PathBuf;

use chrono::Weekday;
use thiserror::Error;

use crate::time::TimeInterval;

/// Core error type for habitweek-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A model value was rejected before entering the engine
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The engine broke its own no-overlap invariant
    #[error("Engine invariant violated: {0}")]
    Overlap(#[from] OverlapError),

    /// A storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Habit '{name}' already exists for user {user}")]
    HabitAlreadyExists { user: String, name: String },

    #[error("Habit '{name}' not found for user {user}")]
    HabitNotFound { user: String, name: String },

    #[error("Event {id} not found for user {user}")]
    EventNotFound { user: String, id: String },
}

/// Rejected model input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange { start: String, end: String },

    /// Time of day outside 00:00..=24:00 or not in HH:MM form
    #[error("Invalid time of day '{0}': expected HH:MM between 00:00 and 24:00")]
    InvalidClockTime(String),

    /// Preferred/Fixed placement without any candidate window
    #[error("Placement '{policy}' requires at least one time window")]
    EmptyWindows { policy: &'static str },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Two intervals on the same day collided inside the occupancy model.
///
/// Never a user-facing condition: the slot finder only hands out free gaps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("interval {requested} on {day} overlaps occupied interval {existing}")]
pub struct OverlapError {
    pub day: Weekday,
    pub requested: TimeInterval,
    pub existing: TimeInterval,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A persisted row could not be turned back into a model value
    #[error("Invalid persisted data: {0}")]
    InvalidData(String),

    /// In-memory store mutex was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Locked));
    }

    #[test]
    fn other_sqlite_errors_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(StorageError::from(err), StorageError::QueryFailed(_)));
    }

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::EmptyWindows { policy: "fixed" }.into();
        assert!(err.to_string().contains("fixed"));
    }
}
