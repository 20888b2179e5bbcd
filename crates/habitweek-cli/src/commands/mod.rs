pub mod calendar;
pub mod config;
pub mod habit;
pub mod settings;
pub mod user;

use std::fmt::Display;

use habitweek_core::{Config, HabitTracker, ScheduleOutcome, SqliteStore};
use serde::Serialize;
use tracing::debug;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Per-invocation settings shared by all commands.
pub struct Context {
    pub config: Config,
    pub json: bool,
}

impl Context {
    /// Open the configured database.
    pub fn tracker(&self) -> Result<HabitTracker<SqliteStore>, Box<dyn std::error::Error>> {
        let path = self.config.database_path()?;
        debug!(path = %path.display(), "opening database");
        Ok(HabitTracker::new(SqliteStore::open(path)?))
    }

    /// Print `value` as pretty JSON or with its `Display` impl.
    pub fn print<T: Serialize + Display>(&self, value: &T) -> CommandResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{value}");
        }
        Ok(())
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> CommandResult {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a schedule result followed by one line per unplaced habit.
    pub fn print_outcome(&self, outcome: &ScheduleOutcome) -> CommandResult {
        if self.json {
            return self.print_json(outcome);
        }
        for habit in &outcome.user.habits {
            print!("{habit}");
        }
        for line in outcome.report.messages() {
            println!("{line}");
        }
        Ok(())
    }
}
