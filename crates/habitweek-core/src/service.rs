//! Application service tying storage and the distribution engine together.
//!
//! Every mutating call loads the user aggregate, runs the engine on it and
//! writes the result back in one [`ScheduleStore::save_schedule`] call, so a
//! failure never leaves half a schedule behind. Callers must not run two
//! mutating calls for the same user concurrently.

use serde::Serialize;
use tracing::info;

use crate::engine::{self, HabitDistributor, UnplacedReport};
use crate::error::{CoreError, Result, ValidationError};
use crate::model::{Event, EventId, Habit, User, UserSettings};
use crate::storage::{ScheduleStore, ScheduleUpdate};
use crate::time::TimeInterval;

/// Updated aggregate plus the habits that could not be fully placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    pub user: User,
    pub report: UnplacedReport,
}

/// Users, calendars and habits on top of a [`ScheduleStore`].
pub struct HabitTracker<S> {
    store: S,
    distributor: HabitDistributor,
}

impl<S: ScheduleStore> HabitTracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_distributor(store, HabitDistributor::new())
    }

    pub fn with_distributor(store: S, distributor: HabitDistributor) -> Self {
        Self { store, distributor }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, name: &str) -> Result<User> {
        self.store
            .load_user(name)?
            .ok_or_else(|| CoreError::UserNotFound(name.to_string()))
    }

    // === Users ===

    pub fn create_user(&self, name: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "user.name".into(),
                message: "must not be empty".into(),
            }
            .into());
        }
        if self.store.user_exists(name)? {
            return Err(CoreError::UserAlreadyExists(name.to_string()));
        }
        let user = User::new(name);
        self.store.create_user(name, &user.settings)?;
        info!(user = name, "created user");
        Ok(user)
    }

    pub fn get_user(&self, name: &str) -> Result<User> {
        self.load(name)
    }

    pub fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.store.list_users()?)
    }

    pub fn delete_user(&self, name: &str) -> Result<()> {
        if !self.store.delete_user(name)? {
            return Err(CoreError::UserNotFound(name.to_string()));
        }
        info!(user = name, "deleted user");
        Ok(())
    }

    // === Calendar ===

    /// Replaces the whole calendar and redistributes every habit.
    ///
    /// Events with an empty owner are adopted by `name`.
    pub fn import_calendar(&self, name: &str, events: Vec<Event>) -> Result<ScheduleOutcome> {
        let mut user = self.load(name)?;
        user.events = events
            .into_iter()
            .map(|event| adopt(name, event))
            .collect::<Result<_>>()?;
        info!(user = name, events = user.events.len(), "imported calendar");
        self.redistribute_and_save(user, false)
    }

    pub fn add_event(&self, name: &str, event: Event) -> Result<ScheduleOutcome> {
        let mut user = self.load(name)?;
        user.events.push(adopt(name, event)?);
        self.redistribute_and_save(user, false)
    }

    pub fn delete_event(&self, name: &str, id: EventId) -> Result<ScheduleOutcome> {
        let mut user = self.load(name)?;
        let position = user
            .events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| CoreError::EventNotFound {
                user: name.to_string(),
                id: id.to_string(),
            })?;
        user.events.remove(position);
        self.redistribute_and_save(user, false)
    }

    pub fn clear_events(&self, name: &str) -> Result<ScheduleOutcome> {
        let mut user = self.load(name)?;
        user.events.clear();
        self.redistribute_and_save(user, false)
    }

    // === Habits ===

    /// Distributes a new habit around everything already placed.
    pub fn add_habit(&self, habit: Habit) -> Result<ScheduleOutcome> {
        let mut user = self.load(&habit.user)?;
        let report = engine::add_habit(&mut user, habit, &self.distributor)?;
        self.store
            .save_schedule(&user.name, ScheduleUpdate::habits(&user.habits))?;
        Ok(ScheduleOutcome { user, report })
    }

    /// Removes one habit. Remaining placements stay where they are.
    pub fn delete_habit(&self, name: &str, habit_name: &str) -> Result<Habit> {
        let mut user = self.load(name)?;
        let removed = engine::delete_habit(&mut user, habit_name)?;
        self.store.delete_habit(name, habit_name)?;
        Ok(removed)
    }

    pub fn delete_habits(&self, name: &str) -> Result<Vec<Habit>> {
        let mut user = self.load(name)?;
        let removed = engine::delete_habits(&mut user);
        self.store.delete_habits(name)?;
        Ok(removed)
    }

    /// Full redistribution without any input change.
    pub fn redistribute(&self, name: &str) -> Result<ScheduleOutcome> {
        let user = self.load(name)?;
        self.redistribute_and_save(user, false)
    }

    // === Settings ===

    pub fn set_notifications(&self, name: &str, on: bool) -> Result<UserSettings> {
        let mut settings = self
            .store
            .load_settings(name)?
            .ok_or_else(|| CoreError::UserNotFound(name.to_string()))?;
        settings.notify_on = on;
        self.store.save_settings(name, &settings)?;
        Ok(settings)
    }

    /// Replaces the banned windows and redistributes every habit around them.
    pub fn set_banned_windows(
        &self,
        name: &str,
        windows: Vec<TimeInterval>,
    ) -> Result<ScheduleOutcome> {
        let mut user = self.load(name)?;
        user.settings.banned_windows = windows;
        self.redistribute_and_save(user, true)
    }

    fn redistribute_and_save(&self, mut user: User, settings_changed: bool) -> Result<ScheduleOutcome> {
        let report = engine::redistribute_all(&mut user, &self.distributor)?;
        self.store.save_schedule(
            &user.name,
            ScheduleUpdate {
                settings: settings_changed.then_some(&user.settings),
                events: Some(user.events.as_slice()),
                habits: &user.habits,
            },
        )?;
        Ok(ScheduleOutcome { user, report })
    }
}

fn adopt(name: &str, mut event: Event) -> Result<Event> {
    if event.user.is_empty() {
        event.user = name.to_string();
    }
    if event.user != name {
        return Err(ValidationError::InvalidValue {
            field: "event.user".into(),
            message: format!("event '{}' belongs to '{}', not '{name}'", event.name, event.user),
        }
        .into());
    }
    Ok(event)
}
