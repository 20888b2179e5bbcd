//! In-process store keeping whole user aggregates behind a mutex.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{EventRepo, HabitRepo, ScheduleStore, ScheduleUpdate, UserRepo};
use crate::error::StorageError;
use crate::model::{Event, EventId, Habit, User, UserSettings};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, User>>, StorageError> {
        self.users.lock().map_err(|_| StorageError::Poisoned)
    }

    fn with_user<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut User) -> T,
    ) -> Result<T, StorageError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(name)
            .ok_or_else(|| StorageError::QueryFailed(format!("unknown user: {name}")))?;
        Ok(f(user))
    }
}

impl UserRepo for MemoryStore {
    fn create_user(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError> {
        let mut users = self.lock()?;
        if users.contains_key(name) {
            return Err(StorageError::QueryFailed(format!("user already stored: {name}")));
        }
        let mut user = User::new(name);
        user.settings = settings.clone();
        users.insert(name.to_string(), user);
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.contains_key(name))
    }

    fn load_settings(&self, name: &str) -> Result<Option<UserSettings>, StorageError> {
        Ok(self.lock()?.get(name).map(|user| user.settings.clone()))
    }

    fn save_settings(&self, name: &str, settings: &UserSettings) -> Result<(), StorageError> {
        self.with_user(name, |user| user.settings = settings.clone())
    }

    fn delete_user(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(name).is_some())
    }

    fn list_users(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

impl EventRepo for MemoryStore {
    fn load_events(&self, user: &str) -> Result<Vec<Event>, StorageError> {
        Ok(self
            .lock()?
            .get(user)
            .map(|u| u.events.clone())
            .unwrap_or_default())
    }

    fn add_event(&self, event: &Event) -> Result<(), StorageError> {
        self.with_user(&event.user, |user| user.events.push(event.clone()))
    }

    fn delete_event(&self, user: &str, id: EventId) -> Result<bool, StorageError> {
        self.with_user(user, |user| {
            let before = user.events.len();
            user.events.retain(|event| event.id != id);
            user.events.len() != before
        })
    }

    fn replace_events(&self, user: &str, events: &[Event]) -> Result<(), StorageError> {
        self.with_user(user, |user| user.events = events.to_vec())
    }
}

impl HabitRepo for MemoryStore {
    fn load_habits(&self, user: &str) -> Result<Vec<Habit>, StorageError> {
        Ok(self
            .lock()?
            .get(user)
            .map(|u| u.habits.clone())
            .unwrap_or_default())
    }

    fn replace_habits(&self, user: &str, habits: &[Habit]) -> Result<(), StorageError> {
        self.with_user(user, |user| user.habits = habits.to_vec())
    }

    fn delete_habit(&self, user: &str, name: &str) -> Result<bool, StorageError> {
        self.with_user(user, |user| {
            let before = user.habits.len();
            user.habits.retain(|habit| habit.name != name);
            user.habits.len() != before
        })
    }

    fn delete_habits(&self, user: &str) -> Result<usize, StorageError> {
        self.with_user(user, |user| std::mem::take(&mut user.habits).len())
    }
}

impl ScheduleStore for MemoryStore {
    fn save_schedule(&self, user: &str, update: ScheduleUpdate<'_>) -> Result<(), StorageError> {
        // Single lock scope, so readers never observe half of an update.
        self.with_user(user, |user| {
            if let Some(settings) = update.settings {
                user.settings = settings.clone();
            }
            if let Some(events) = update.events {
                user.events = events.to_vec();
            }
            user.habits = update.habits.to_vec();
        })
    }

    fn load_user(&self, name: &str) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Placement;
    use chrono::Weekday;

    #[test]
    fn unknown_user_writes_fail() {
        let store = MemoryStore::new();
        let event = Event::weekly("Work", "ghost", Weekday::Mon, "09:00", "18:00").unwrap();
        assert!(store.add_event(&event).is_err());
        assert!(store.load_events("ghost").unwrap().is_empty());
    }

    #[test]
    fn save_schedule_replaces_events_and_habits() {
        let store = MemoryStore::new();
        store.create_user("egor", &UserSettings::default()).unwrap();
        assert!(store.create_user("egor", &UserSettings::default()).is_err());

        let events = [Event::weekly("Work", "egor", Weekday::Mon, "09:00", "18:00").unwrap()];
        let habits = [Habit::new("Read", "egor", 30, Placement::Free, 1).unwrap()];
        store
            .save_schedule(
                "egor",
                ScheduleUpdate {
                    settings: None,
                    events: Some(events.as_slice()),
                    habits: &habits,
                },
            )
            .unwrap();

        let user = store.load_user("egor").unwrap().unwrap();
        assert_eq!(user.events.len(), 1);
        assert_eq!(user.habits.len(), 1);
        assert_eq!(store.delete_habits("egor").unwrap(), 1);
        assert!(store.delete_user("egor").unwrap());
        assert!(store.load_user("egor").unwrap().is_none());
    }
}
