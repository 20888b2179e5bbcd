//! User-level distribution: full redistribution, incremental add, deletion.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::distributor::HabitDistributor;
use super::occupancy::Occupancy;
use crate::error::{CoreError, OverlapError, ValidationError};
use crate::model::{Habit, User};

/// Habit name to number of occurrences that could not be placed.
///
/// Only habits with a positive count are ever present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnplacedReport(BTreeMap<String, u32>);

impl UnplacedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `count` for `name`; zero counts are dropped.
    pub fn record(&mut self, name: &str, count: u32) {
        if count > 0 {
            self.0.insert(name.to_string(), count);
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// One human-readable line per habit.
    pub fn messages(&self) -> Vec<String> {
        self.iter()
            .map(|(name, count)| format!("Habit {name} wasn't distributed for {count} times."))
            .collect()
    }
}

impl fmt::Display for UnplacedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.messages().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Clears every placement and distributes all habits again, oldest first.
///
/// Occupancy is rebuilt from events and settings only. On error the user is
/// left untouched.
pub fn redistribute_all(
    user: &mut User,
    distributor: &HabitDistributor,
) -> Result<UnplacedReport, OverlapError> {
    let mut occupancy = Occupancy::from_calendar(&user.events, &user.settings);
    let mut habits = user.habits.clone();
    // Stable: habits created in the same instant keep their stored order.
    habits.sort_by_key(|habit| habit.created_at);

    let mut report = UnplacedReport::new();
    for habit in &mut habits {
        let distribution = distributor.distribute(habit, &mut occupancy)?;
        habit.occurrences = distribution.placed;
        report.record(&habit.name, distribution.unplaced);
    }

    user.habits = habits;
    info!(
        user = %user.name,
        habits = user.habits.len(),
        events = user.events.len(),
        unplaced = report.len(),
        "redistributed schedule"
    );
    Ok(report)
}

/// Appends `habit` with the lowest priority and distributes it against the
/// current occupancy. Existing placements are not touched.
///
/// `created_at` is restamped to sort after every existing habit, so later
/// full redistributions keep the new habit last. The returned report covers
/// the new habit only.
pub fn add_habit(
    user: &mut User,
    mut habit: Habit,
    distributor: &HabitDistributor,
) -> Result<UnplacedReport, CoreError> {
    habit.validate()?;
    if habit.user != user.name {
        return Err(ValidationError::InvalidValue {
            field: "habit.user".to_string(),
            message: format!("habit belongs to '{}', not '{}'", habit.user, user.name),
        }
        .into());
    }
    if user.habit(&habit.name).is_some() {
        return Err(CoreError::HabitAlreadyExists {
            user: user.name.clone(),
            name: habit.name,
        });
    }

    let mut occupancy = Occupancy::from_calendar(&user.events, &user.settings);
    occupancy.mark_habits(&user.habits)?;

    let now = Utc::now();
    habit.created_at = match user.habits.iter().map(|h| h.created_at).max() {
        Some(latest) => now.max(latest + Duration::nanoseconds(1)),
        None => now,
    };

    let distribution = distributor.distribute(&habit, &mut occupancy)?;
    habit.occurrences = distribution.placed;

    let mut report = UnplacedReport::new();
    report.record(&habit.name, distribution.unplaced);
    if !report.is_empty() {
        info!(user = %user.name, habit = %habit.name, unplaced = distribution.unplaced, "habit not fully distributed");
    }
    user.habits.push(habit);
    Ok(report)
}

/// Removes one habit; its slots become free for later placements only.
pub fn delete_habit(user: &mut User, name: &str) -> Result<Habit, CoreError> {
    let position = user
        .habits
        .iter()
        .position(|habit| habit.name == name)
        .ok_or_else(|| CoreError::HabitNotFound {
            user: user.name.clone(),
            name: name.to_string(),
        })?;
    let removed = user.habits.remove(position);
    info!(user = %user.name, habit = %removed.name, freed = removed.occurrences.len(), "deleted habit");
    Ok(removed)
}

/// Removes every habit of the user, returning them.
pub fn delete_habits(user: &mut User) -> Vec<Habit> {
    let removed = std::mem::take(&mut user.habits);
    info!(user = %user.name, count = removed.len(), "deleted all habits");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, Placement};
    use crate::time::{TimeInterval, WEEK};
    use chrono::Weekday;

    fn iv(start: &str, end: &str) -> TimeInterval {
        TimeInterval::parse(start, end).unwrap()
    }

    fn user_with_evenings_only() -> User {
        let mut user = User::new("egor");
        for day in WEEK {
            user.events
                .push(Event::weekly("Busy", "egor", day, "00:00", "18:00").unwrap());
            user.events
                .push(Event::weekly("Sleep", "egor", day, "19:00", "24:00").unwrap());
        }
        user
    }

    #[test]
    fn report_keeps_only_positive_counts() {
        let mut report = UnplacedReport::new();
        report.record("A", 0);
        report.record("B", 2);
        assert_eq!(report.len(), 1);
        assert_eq!(report.get("A"), None);
        assert_eq!(
            report.messages(),
            vec!["Habit B wasn't distributed for 2 times.".to_string()]
        );
    }

    #[test]
    fn redistribute_honours_creation_order() {
        let mut user = user_with_evenings_only();
        let mut late = Habit::new("Late", "egor", 60, Placement::Free, 7).unwrap();
        let early = Habit::new("Early", "egor", 60, Placement::Free, 7).unwrap();
        late.created_at = early.created_at + Duration::seconds(5);
        // Stored out of order on purpose.
        user.habits = vec![late, early];

        let report = redistribute_all(&mut user, &HabitDistributor::new()).unwrap();

        assert_eq!(user.habits[0].name, "Early");
        assert_eq!(user.habit("Early").unwrap().placed(), 7);
        assert_eq!(report.get("Late"), Some(7));
        assert!(report.get("Early").is_none());
    }

    #[test]
    fn add_habit_keeps_existing_placements() {
        let mut user = user_with_evenings_only();
        let distributor = HabitDistributor::new();
        let first = Habit::new("First", "egor", 30, Placement::Free, 1).unwrap();
        add_habit(&mut user, first, &distributor).unwrap();
        let placed_before = user.habit("First").unwrap().occurrences.clone();

        let second = Habit::new("Second", "egor", 30, Placement::Free, 1).unwrap();
        let report = add_habit(&mut user, second, &distributor).unwrap();

        assert!(report.is_empty());
        assert_eq!(user.habit("First").unwrap().occurrences, placed_before);
        let second = user.habit("Second").unwrap();
        assert_eq!(second.occurrences[0].day, Weekday::Mon);
        assert_eq!(second.occurrences[0].interval, iv("18:30", "19:00"));
    }

    #[test]
    fn added_habit_stays_last_after_redistribution() {
        // Monday..Sunday 18:00-19:00 is the only free time.
        let mut user = user_with_evenings_only();
        let distributor = HabitDistributor::new();
        let first = Habit::new("First", "egor", 60, Placement::Free, 7).unwrap();
        let mut second = Habit::new("Second", "egor", 60, Placement::Free, 1).unwrap();
        second.created_at = first.created_at - Duration::hours(1);

        add_habit(&mut user, first, &distributor).unwrap();
        let report = add_habit(&mut user, second, &distributor).unwrap();
        assert_eq!(report.get("Second"), Some(1));
        assert!(user.habits[1].created_at > user.habits[0].created_at);

        let report = redistribute_all(&mut user, &distributor).unwrap();
        assert_eq!(report.get("Second"), Some(1));
        assert_eq!(report.get("First"), None);
        assert_eq!(user.habit("First").unwrap().placed(), 7);
    }

    #[test]
    fn add_habit_rejects_duplicate_name() {
        let mut user = User::new("egor");
        let distributor = HabitDistributor::new();
        add_habit(
            &mut user,
            Habit::new("Read", "egor", 30, Placement::Free, 1).unwrap(),
            &distributor,
        )
        .unwrap();
        let err = add_habit(
            &mut user,
            Habit::new("Read", "egor", 15, Placement::Free, 2).unwrap(),
            &distributor,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::HabitAlreadyExists { .. }));
        assert_eq!(user.habits.len(), 1);
    }

    #[test]
    fn add_habit_rejects_foreign_owner() {
        let mut user = User::new("egor");
        let habit = Habit::new("Read", "anna", 30, Placement::Free, 1).unwrap();
        let err = add_habit(&mut user, habit, &HabitDistributor::new()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn delete_habit_frees_slot_for_next_add() {
        let mut user = user_with_evenings_only();
        let distributor = HabitDistributor::new();
        let filler = Habit::new("Filler", "egor", 60, Placement::Free, 7).unwrap();
        add_habit(&mut user, filler, &distributor).unwrap();

        let blocked = Habit::new("Blocked", "egor", 60, Placement::Free, 1).unwrap();
        let report = add_habit(&mut user, blocked, &distributor).unwrap();
        assert_eq!(report.get("Blocked"), Some(1));

        delete_habit(&mut user, "Filler").unwrap();
        delete_habit(&mut user, "Blocked").unwrap();
        let retry = Habit::new("Blocked", "egor", 60, Placement::Free, 1).unwrap();
        let report = add_habit(&mut user, retry, &distributor).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn delete_unknown_habit_fails() {
        let mut user = User::new("egor");
        assert!(matches!(
            delete_habit(&mut user, "Nope"),
            Err(CoreError::HabitNotFound { .. })
        ));
        assert!(delete_habits(&mut user).is_empty());
    }
}
