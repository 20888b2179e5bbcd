//! Domain model: calendar events, habits, settings and the user aggregate.
//!
//! Variant-shaped data (event recurrence, habit placement) is modelled as
//! closed enums. Habits and events refer to their owner by name only; the
//! `User` aggregate owns them by value.

mod event;
mod habit;
mod user;

pub use event::{Event, EventId, Recurrence};
pub use habit::{Habit, HabitId, HabitStatus, Occurrence, Placement};
pub use user::{User, UserSettings};
