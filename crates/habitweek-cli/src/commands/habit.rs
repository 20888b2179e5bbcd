//! Habit management commands for CLI.

use clap::{Subcommand, ValueEnum};
use habitweek_core::time::parse_windows;
use habitweek_core::{Habit, HabitStatus, Placement};
use serde::Serialize;

use super::{CommandResult, Context};

#[derive(Clone, Copy, ValueEnum)]
pub enum Policy {
    /// Anywhere in the day
    Free,
    /// Inside `--windows` if possible, anywhere otherwise
    Preferred,
    /// Only inside `--windows`
    Fixed,
}

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a habit and distribute it around the existing schedule
    Add {
        #[arg(long, short)]
        user: String,
        /// Habit name, unique per user
        name: String,
        /// Duration of one occurrence in minutes
        #[arg(long)]
        minutes: u16,
        /// Occurrences per week
        #[arg(long, default_value = "1")]
        times: u32,
        #[arg(long, value_enum, default_value = "free")]
        policy: Policy,
        /// Comma-separated HH:MM-HH:MM windows for preferred/fixed
        #[arg(long)]
        windows: Option<String>,
    },
    /// List habits with their occurrences
    List {
        #[arg(long, short)]
        user: String,
    },
    /// Delete one habit (other habits keep their slots)
    Delete {
        #[arg(long, short)]
        user: String,
        name: String,
    },
    /// Delete all habits
    Clear {
        #[arg(long, short)]
        user: String,
    },
    /// Recompute every habit's occurrences from scratch
    Redistribute {
        #[arg(long, short)]
        user: String,
    },
}

#[derive(Serialize)]
struct HabitSummary<'a> {
    #[serde(flatten)]
    habit: &'a Habit,
    status: HabitStatus,
    unplaced: u32,
}

fn placement(policy: Policy, windows: Option<&str>) -> Result<Placement, Box<dyn std::error::Error>> {
    let windows = windows.map(parse_windows).transpose()?.unwrap_or_default();
    Ok(match policy {
        Policy::Free if !windows.is_empty() => {
            return Err("--windows is only valid with --policy preferred or fixed".into())
        }
        Policy::Free => Placement::Free,
        Policy::Preferred => Placement::Preferred(windows),
        Policy::Fixed => Placement::Fixed(windows),
    })
}

pub fn run(action: HabitAction, ctx: &Context) -> CommandResult {
    let tracker = ctx.tracker()?;

    match action {
        HabitAction::Add {
            user,
            name,
            minutes,
            times,
            policy,
            windows,
        } => {
            let habit = Habit::new(
                name,
                user,
                minutes,
                placement(policy, windows.as_deref())?,
                times,
            )?;
            let name = habit.name.clone();
            let outcome = tracker.add_habit(habit)?;
            if ctx.json {
                ctx.print_json(&outcome)?;
            } else {
                if let Some(habit) = outcome.user.habit(&name) {
                    print!("{habit}");
                }
                for line in outcome.report.messages() {
                    println!("{line}");
                }
            }
        }
        HabitAction::List { user } => {
            let user = tracker.get_user(&user)?;
            if ctx.json {
                let summaries: Vec<_> = user
                    .habits
                    .iter()
                    .map(|habit| HabitSummary {
                        habit,
                        status: habit.status(),
                        unplaced: habit.unplaced(),
                    })
                    .collect();
                ctx.print_json(&summaries)?;
            } else if user.habits.is_empty() {
                println!("NO HABITS");
            } else {
                for habit in &user.habits {
                    print!("{habit}");
                }
            }
        }
        HabitAction::Delete { user, name } => {
            let removed = tracker.delete_habit(&user, &name)?;
            println!("Habit deleted: {}", removed.name);
        }
        HabitAction::Clear { user } => {
            let removed = tracker.delete_habits(&user)?;
            println!("Deleted {} habits", removed.len());
        }
        HabitAction::Redistribute { user } => {
            let outcome = tracker.redistribute(&user)?;
            ctx.print_outcome(&outcome)?;
        }
    }
    Ok(())
}
