//! Habit distribution engine.
//!
//! Pure, synchronous computation over one user's aggregate:
//! - [`occupancy`] keeps per-day busy intervals
//! - [`slot`] finds the leftmost free fit inside candidate windows
//! - [`distributor`] places a single habit's occurrences
//! - [`pipeline`] runs distribution for a whole user

pub mod distributor;
pub mod occupancy;
pub mod pipeline;
pub mod slot;

pub use distributor::{Distribution, DistributorConfig, HabitDistributor};
pub use occupancy::Occupancy;
pub use pipeline::{add_habit, delete_habit, delete_habits, redistribute_all, UnplacedReport};
pub use slot::find_slot;
