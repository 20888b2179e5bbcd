use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Event, Habit};
use crate::time::TimeInterval;

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub notify_on: bool,
    /// Blackout windows, treated as busy on every day of the week.
    #[serde(default)]
    pub banned_windows: Vec<TimeInterval>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notify_on: true,
            banned_windows: Vec::new(),
        }
    }
}

/// One user's calendar, habits and settings.
///
/// `habits` is kept in creation order; that order is the placement priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub settings: UserSettings,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub habits: Vec<Habit>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: UserSettings::default(),
            events: Vec::new(),
            habits: Vec::new(),
        }
    }

    pub fn habit(&self, name: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.name == name)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "USER: {}", self.name)?;
        if self.habits.is_empty() {
            writeln!(f, "NO HABITS")?;
        }
        for habit in &self.habits {
            write!(f, "{habit}")?;
        }
        if self.events.is_empty() {
            writeln!(f, "NO EVENTS")?;
        }
        for event in &self.events {
            writeln!(f, "{event}")?;
        }
        write!(f, "SETTINGS: notify_on = {}", self.settings.notify_on)?;
        for window in &self.settings.banned_windows {
            write!(f, "\n    banned {window}")?;
        }
        Ok(())
    }
}
