//! Calendar commands for CLI.

use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use clap::{Subcommand, ValueEnum};
use habitweek_core::{ClockTime, Event, Recurrence};
use uuid::Uuid;

use super::{CommandResult, Context};

#[derive(Clone, Copy, ValueEnum)]
pub enum Repeat {
    /// Every week on a weekday (`--on mon`)
    Weekly,
    /// Every two weeks from an anchor date (`--on 2024-03-06`)
    Biweekly,
    /// A single date (`--on 2024-03-06`)
    Once,
}

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Replace the calendar with events from a JSON file and redistribute
    Import {
        #[arg(long, short)]
        user: String,
        /// JSON array of event records
        file: PathBuf,
    },
    /// Add one event and redistribute
    Add {
        #[arg(long, short)]
        user: String,
        /// Event name
        name: String,
        /// Start time (HH:MM)
        #[arg(long)]
        start: String,
        /// End time (HH:MM)
        #[arg(long)]
        end: String,
        #[arg(long, value_enum, default_value = "weekly")]
        repeat: Repeat,
        /// Weekday for weekly events, date otherwise
        #[arg(long)]
        on: String,
    },
    /// List events
    List {
        #[arg(long, short)]
        user: String,
    },
    /// Delete an event by ID and redistribute
    Delete {
        #[arg(long, short)]
        user: String,
        id: Uuid,
    },
    /// Delete all events and redistribute
    Clear {
        #[arg(long, short)]
        user: String,
    },
}

fn parse_recurrence(repeat: Repeat, on: &str) -> Result<Recurrence, Box<dyn std::error::Error>> {
    let date = || {
        on.parse::<NaiveDate>()
            .map_err(|e| format!("invalid date '{on}': {e}"))
    };
    Ok(match repeat {
        Repeat::Weekly => Recurrence::Weekly(
            on.parse::<Weekday>()
                .map_err(|_| format!("invalid weekday '{on}'"))?,
        ),
        Repeat::Biweekly => Recurrence::BiWeekly(date()?),
        Repeat::Once => Recurrence::Once(date()?),
    })
}

pub fn run(action: CalendarAction, ctx: &Context) -> CommandResult {
    let tracker = ctx.tracker()?;

    match action {
        CalendarAction::Import { user, file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            let events: Vec<Event> = serde_json::from_str(&content)?;
            let outcome = tracker.import_calendar(&user, events)?;
            if !ctx.json {
                println!("Imported {} events", outcome.user.events.len());
            }
            ctx.print_outcome(&outcome)?;
        }
        CalendarAction::Add {
            user,
            name,
            start,
            end,
            repeat,
            on,
        } => {
            let start: ClockTime = start.parse()?;
            let end: ClockTime = end.parse()?;
            let event = Event::new(name, user.as_str(), start, end, parse_recurrence(repeat, &on)?)?;
            let id = event.id;
            let outcome = tracker.add_event(&user, event)?;
            if !ctx.json {
                println!("Event created: {id}");
            }
            ctx.print_outcome(&outcome)?;
        }
        CalendarAction::List { user } => {
            let user = tracker.get_user(&user)?;
            if ctx.json {
                ctx.print_json(&user.events)?;
            } else if user.events.is_empty() {
                println!("NO EVENTS");
            } else {
                for event in &user.events {
                    println!("{}  {event}", event.id);
                }
            }
        }
        CalendarAction::Delete { user, id } => {
            let outcome = tracker.delete_event(&user, id)?;
            if !ctx.json {
                println!("Event deleted: {id}");
            }
            ctx.print_outcome(&outcome)?;
        }
        CalendarAction::Clear { user } => {
            let outcome = tracker.clear_events(&user)?;
            if !ctx.json {
                println!("Calendar cleared");
            }
            ctx.print_outcome(&outcome)?;
        }
    }
    Ok(())
}
