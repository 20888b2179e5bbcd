//! User management commands for CLI.

use clap::Subcommand;

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user
    Create {
        /// Unique user name
        name: String,
    },
    /// Show a user's calendar, habits and settings
    Show {
        name: String,
    },
    /// List user names
    List,
    /// Delete a user with all events and habits
    Delete {
        name: String,
    },
}

pub fn run(action: UserAction, ctx: &Context) -> CommandResult {
    let tracker = ctx.tracker()?;

    match action {
        UserAction::Create { name } => {
            let user = tracker.create_user(&name)?;
            if ctx.json {
                ctx.print_json(&user)?;
            } else {
                println!("User created: {}", user.name);
            }
        }
        UserAction::Show { name } => {
            let user = tracker.get_user(&name)?;
            ctx.print(&user)?;
        }
        UserAction::List => {
            let names = tracker.list_users()?;
            if ctx.json {
                ctx.print_json(&names)?;
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        UserAction::Delete { name } => {
            tracker.delete_user(&name)?;
            println!("User deleted: {name}");
        }
    }
    Ok(())
}
