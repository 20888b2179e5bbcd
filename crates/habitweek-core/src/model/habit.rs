use std::fmt;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::time::TimeInterval;

pub type HabitId = Uuid;

/// Where a habit may be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "windows", rename_all = "snake_case")]
pub enum Placement {
    /// Anywhere in the day.
    Free,
    /// Try these windows first, fall back to anywhere.
    Preferred(Vec<TimeInterval>),
    /// Only inside these windows.
    Fixed(Vec<TimeInterval>),
}

impl Placement {
    pub fn name(&self) -> &'static str {
        match self {
            Placement::Free => "free",
            Placement::Preferred(_) => "preferred",
            Placement::Fixed(_) => "fixed",
        }
    }

    /// Declared candidate windows, empty for `Free`.
    pub fn windows(&self) -> &[TimeInterval] {
        match self {
            Placement::Free => &[],
            Placement::Preferred(windows) | Placement::Fixed(windows) => windows,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Placement::Free => Ok(()),
            Placement::Preferred(windows) | Placement::Fixed(windows) if windows.is_empty() => {
                Err(ValidationError::EmptyWindows {
                    policy: self.name(),
                })
            }
            Placement::Preferred(_) | Placement::Fixed(_) => Ok(()),
        }
    }
}

/// One scheduled instance of a habit in the canonical week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub day: Weekday,
    pub interval: TimeInterval,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.interval)
    }
}

/// Derived placement outcome of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitStatus {
    FullyPlaced,
    PartiallyPlaced,
    Unplaced,
}

/// A recurring personal task needing `times_per_week` slots of `minutes` each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Owning user name.
    pub user: String,
    pub minutes: u16,
    pub placement: Placement,
    pub times_per_week: u32,
    pub created_at: DateTime<Utc>,
    /// Filled only by the distribution engine.
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

impl Habit {
    /// Create a habit with no occurrences yet.
    ///
    /// Rejects empty names, zero duration, zero weekly count and
    /// window-less `Preferred`/`Fixed` placements.
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        minutes: u16,
        placement: Placement,
        times_per_week: u32,
    ) -> Result<Self, ValidationError> {
        let habit = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user: user.into(),
            minutes,
            placement,
            times_per_week,
            created_at: Utc::now(),
            occurrences: Vec::new(),
        };
        habit.validate()?;
        Ok(habit)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "habit.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "habit.minutes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.times_per_week == 0 {
            return Err(ValidationError::InvalidValue {
                field: "habit.times_per_week".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        self.placement.validate()
    }

    pub fn placed(&self) -> u32 {
        self.occurrences.len() as u32
    }

    pub fn unplaced(&self) -> u32 {
        self.times_per_week.saturating_sub(self.placed())
    }

    pub fn status(&self) -> HabitStatus {
        match self.unplaced() {
            0 => HabitStatus::FullyPlaced,
            n if n == self.times_per_week => HabitStatus::Unplaced,
            _ => HabitStatus::PartiallyPlaced,
        }
    }

    pub fn occurrences_on(&self, day: Weekday) -> usize {
        self.occurrences.iter().filter(|o| o.day == day).count()
    }
}

impl fmt::Display for Habit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "HABIT: {} ({} min, {}x/week, {})",
            self.name,
            self.minutes,
            self.times_per_week,
            self.placement.name()
        )?;
        for window in self.placement.windows() {
            writeln!(f, "    window {window}")?;
        }
        if self.occurrences.is_empty() {
            writeln!(f, "    NOT DISTRIBUTED")?;
        }
        for occurrence in &self.occurrences {
            writeln!(f, "    {occurrence}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: &str, end: &str) -> TimeInterval {
        TimeInterval::parse(start, end).unwrap()
    }

    #[test]
    fn habit_rejects_empty_windows() {
        let err = Habit::new("Run", "egor", 30, Placement::Fixed(vec![]), 3).unwrap_err();
        assert_eq!(err, ValidationError::EmptyWindows { policy: "fixed" });
        assert!(Habit::new("Run", "egor", 30, Placement::Preferred(vec![]), 3).is_err());
    }

    #[test]
    fn habit_rejects_zero_duration_and_count() {
        assert!(Habit::new("Run", "egor", 0, Placement::Free, 3).is_err());
        assert!(Habit::new("Run", "egor", 30, Placement::Free, 0).is_err());
    }

    #[test]
    fn status_is_derived_from_occurrences() {
        let mut habit = Habit::new("Read", "egor", 30, Placement::Free, 2).unwrap();
        assert_eq!(habit.status(), HabitStatus::Unplaced);

        habit.occurrences.push(Occurrence {
            day: Weekday::Mon,
            interval: window("18:00", "18:30"),
        });
        assert_eq!(habit.status(), HabitStatus::PartiallyPlaced);
        assert_eq!(habit.unplaced(), 1);

        habit.occurrences.push(Occurrence {
            day: Weekday::Tue,
            interval: window("18:00", "18:30"),
        });
        assert_eq!(habit.status(), HabitStatus::FullyPlaced);
    }

    #[test]
    fn display_marks_undistributed_habits() {
        let habit = Habit::new(
            "Stretch",
            "egor",
            15,
            Placement::Preferred(vec![window("07:00", "08:00")]),
            1,
        )
        .unwrap();
        let text = habit.to_string();
        assert!(text.contains("NOT DISTRIBUTED"));
        assert!(text.contains("window 07:00-08:00"));
    }

    #[test]
    fn placement_serializes_with_policy_tag() {
        let placement = Placement::Fixed(vec![window("07:00", "09:00")]);
        let json = serde_json::to_value(&placement).unwrap();
        assert_eq!(json["policy"], "fixed");
        assert_eq!(json["windows"][0]["start"], "07:00");
        let free = serde_json::to_value(Placement::Free).unwrap();
        assert_eq!(free["policy"], "free");
    }
}
