//! # Habitweek Core Library
//!
//! Core logic for Habitweek: a user's recurring weekly calendar, a backlog of
//! habits, and the engine that fits habit occurrences around the calendar.
//! The `habitweek` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Time**: minute-resolution clock times and half-open intervals inside
//!   one canonical week
//! - **Model**: events, habits and the user aggregate
//! - **Engine**: occupancy model, slot finder, per-habit distributor and the
//!   redistribution pipeline; pure and synchronous
//! - **Storage**: repository ports with SQLite and in-memory adapters, plus
//!   TOML configuration
//! - **Service**: [`HabitTracker`], which loads a user, runs the engine and
//!   persists the result atomically
//!
//! ## Key Components
//!
//! - [`HabitDistributor`]: places one habit's weekly occurrences
//! - [`redistribute_all`] / [`add_habit`]: user-level distribution
//! - [`SqliteStore`]: persistent [`ScheduleStore`]
//! - [`Config`]: application configuration management

pub mod engine;
pub mod error;
pub mod model;
pub mod service;
pub mod storage;
pub mod time;

pub use engine::{
    add_habit, delete_habit, delete_habits, find_slot, redistribute_all, Distribution,
    HabitDistributor, Occupancy, UnplacedReport,
};
pub use error::{ConfigError, CoreError, OverlapError, StorageError, ValidationError};
pub use model::{
    Event, EventId, Habit, HabitId, HabitStatus, Occurrence, Placement, Recurrence, User,
    UserSettings,
};
pub use service::{HabitTracker, ScheduleOutcome};
pub use storage::{data_dir, Config, MemoryStore, ScheduleStore, ScheduleUpdate, SqliteStore};
pub use time::{ClockTime, TimeInterval, DAY, WEEK};
