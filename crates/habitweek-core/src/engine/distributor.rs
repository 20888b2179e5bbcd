//! Placement of one habit's weekly occurrences.
//!
//! Days are always tried Monday..Sunday. A cycle visits each day once and puts
//! at most one more occurrence of the habit on it, so the first cycle gives
//! every day at most one occurrence. Only habits wanting more than seven
//! occurrences run further cycles; those stop as soon as the count is met or
//! after two consecutive cycles that place nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::occupancy::Occupancy;
use super::slot::find_slot;
use crate::error::OverlapError;
use crate::model::{Habit, Occurrence, Placement};
use crate::time::{day_index, TimeInterval, DAY, WEEK};

/// Outcome of distributing one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Placed occurrences, in placement order.
    pub placed: Vec<Occurrence>,
    /// `times_per_week - placed.len()`.
    pub unplaced: u32,
}

/// Distributor configuration
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Consecutive cycles without progress before giving up on round-robin
    pub max_idle_cycles: u32,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self { max_idle_cycles: 2 }
    }
}

/// Greedy per-habit distributor.
#[derive(Debug, Clone, Default)]
pub struct HabitDistributor {
    config: DistributorConfig,
}

/// Running placement state for a single habit.
struct Progress {
    target: u32,
    placed: Vec<Occurrence>,
    per_day: [u32; 7],
}

impl Progress {
    fn done(&self) -> bool {
        self.placed.len() as u32 >= self.target
    }
}

impl HabitDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DistributorConfig) -> Self {
        Self { config }
    }

    /// Places as many occurrences of `habit` as possible, marking each one in
    /// `occupancy` before looking for the next.
    ///
    /// The habit itself is not modified. An `OverlapError` means the slot
    /// finder and the occupancy model disagree and is never expected.
    pub fn distribute(
        &self,
        habit: &Habit,
        occupancy: &mut Occupancy,
    ) -> Result<Distribution, OverlapError> {
        let mut progress = Progress {
            target: habit.times_per_week,
            placed: Vec::new(),
            per_day: [0; 7],
        };

        let mut cap = 1;
        let mut idle_cycles = 0;
        loop {
            let before = progress.placed.len();
            self.cycle(habit, occupancy, &mut progress, cap)?;

            if progress.done() || habit.times_per_week as usize <= WEEK.len() {
                break;
            }
            if progress.placed.len() == before {
                idle_cycles += 1;
                if idle_cycles >= self.config.max_idle_cycles {
                    break;
                }
            } else {
                idle_cycles = 0;
            }
            cap += 1;
        }

        let unplaced = habit.times_per_week - progress.placed.len() as u32;
        info!(
            habit = %habit.name,
            policy = habit.placement.name(),
            placed = progress.placed.len(),
            unplaced,
            "distributed habit"
        );
        Ok(Distribution {
            placed: progress.placed,
            unplaced,
        })
    }

    /// One Monday..Sunday cycle, policy passes included.
    fn cycle(
        &self,
        habit: &Habit,
        occupancy: &mut Occupancy,
        progress: &mut Progress,
        cap: u32,
    ) -> Result<(), OverlapError> {
        match &habit.placement {
            Placement::Fixed(windows) => self.pass(habit, windows, occupancy, progress, cap),
            Placement::Preferred(windows) => {
                self.pass(habit, windows, occupancy, progress, cap)?;
                self.pass(habit, &[DAY], occupancy, progress, cap)
            }
            Placement::Free => self.pass(habit, &[DAY], occupancy, progress, cap),
        }
    }

    /// Sweeps the week once, trying `windows` on every day that holds fewer
    /// than `cap` occurrences of the habit.
    fn pass(
        &self,
        habit: &Habit,
        windows: &[TimeInterval],
        occupancy: &mut Occupancy,
        progress: &mut Progress,
        cap: u32,
    ) -> Result<(), OverlapError> {
        for day in WEEK {
            if progress.done() {
                break;
            }
            let idx = day_index(day);
            if progress.per_day[idx] >= cap {
                continue;
            }
            let Some(interval) = find_slot(occupancy, day, habit.minutes, windows)
                .and_then(|start| TimeInterval::starting_at(start, habit.minutes))
            else {
                continue;
            };

            occupancy.mark_occupied(day, interval)?;
            progress.per_day[idx] += 1;
            progress.placed.push(Occurrence { day, interval });
            debug!(habit = %habit.name, %day, %interval, "placed occurrence");
        }
        Ok(())
    }
}
