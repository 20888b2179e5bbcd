//! Per-day busy intervals of the canonical week.
//!
//! Each day is a sorted `Vec` of disjoint intervals. Calendar events and
//! banned windows are merged in with [`Occupancy::block`] (they may overlap
//! each other); habit placements go through [`Occupancy::mark_occupied`],
//! which refuses to overlap anything.

use chrono::Weekday;

use crate::error::OverlapError;
use crate::model::{Event, Habit, UserSettings};
use crate::time::{day_index, ClockTime, TimeInterval, DAY, WEEK};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    days: [Vec<TimeInterval>; 7],
}

impl Occupancy {
    /// Empty week.
    pub fn new() -> Self {
        Self::default()
    }

    /// Week occupied by calendar events and the user's banned windows only.
    pub fn from_calendar(events: &[Event], settings: &UserSettings) -> Self {
        let mut occupancy = Self::new();
        for event in events {
            occupancy.block(event.day(), event.interval);
        }
        for window in &settings.banned_windows {
            for day in WEEK {
                occupancy.block(day, *window);
            }
        }
        occupancy
    }

    /// Adds every occurrence of already placed habits.
    pub fn mark_habits(&mut self, habits: &[Habit]) -> Result<(), OverlapError> {
        for habit in habits {
            for occurrence in &habit.occurrences {
                self.mark_occupied(occurrence.day, occurrence.interval)?;
            }
        }
        Ok(())
    }

    /// Busy intervals of a day, sorted and disjoint.
    pub fn occupied(&self, day: Weekday) -> &[TimeInterval] {
        &self.days[day_index(day)]
    }

    /// Complement of [`Occupancy::occupied`] within `[00:00, 24:00)`.
    pub fn free_gaps(&self, day: Weekday) -> Vec<TimeInterval> {
        let mut gaps = Vec::new();
        let mut cursor = ClockTime::MIDNIGHT;
        for busy in self.occupied(day) {
            if let Ok(gap) = TimeInterval::new(cursor, busy.start()) {
                gaps.push(gap);
            }
            cursor = cursor.max(busy.end());
        }
        if let Ok(gap) = TimeInterval::new(cursor, DAY.end()) {
            gaps.push(gap);
        }
        gaps
    }

    /// Inserts a habit placement; fails if it overlaps anything already busy.
    pub fn mark_occupied(
        &mut self,
        day: Weekday,
        interval: TimeInterval,
    ) -> Result<(), OverlapError> {
        let intervals = &mut self.days[day_index(day)];
        let at = intervals.partition_point(|busy| busy.end() <= interval.start());
        if let Some(existing) = intervals.get(at).filter(|busy| busy.overlaps(&interval)) {
            return Err(OverlapError {
                day,
                requested: interval,
                existing: *existing,
            });
        }
        intervals.insert(at, interval);
        Ok(())
    }

    /// Inserts a busy interval, merging with any interval it overlaps or touches.
    pub fn block(&mut self, day: Weekday, interval: TimeInterval) {
        let intervals = &mut self.days[day_index(day)];
        let first = intervals.partition_point(|busy| busy.end() < interval.start());
        let last = intervals.partition_point(|busy| busy.start() <= interval.end());

        let mut merged = interval;
        if first < last {
            let start = merged.start().min(intervals[first].start());
            let end = merged.end().max(intervals[last - 1].end());
            if let Ok(joined) = TimeInterval::new(start, end) {
                merged = joined;
            }
        }
        intervals.splice(first..last, std::iter::once(merged));
    }
}
