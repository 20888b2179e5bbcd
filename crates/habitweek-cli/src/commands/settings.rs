use clap::Subcommand;
use habitweek_core::time::parse_windows;

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Turn notifications on or off
    Notify {
        #[arg(long, short)]
        user: String,
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Replace the banned windows (kept free on every day) and redistribute
    Ban {
        #[arg(long, short)]
        user: String,
        /// Comma-separated HH:MM-HH:MM windows; omit to clear
        windows: Option<String>,
    },
}

pub fn run(action: SettingsAction, ctx: &Context) -> CommandResult {
    let tracker = ctx.tracker()?;

    match action {
        SettingsAction::Notify { user, enabled } => {
            let settings = tracker.set_notifications(&user, enabled)?;
            if ctx.json {
                ctx.print_json(&settings)?;
            } else {
                println!("notify_on = {}", settings.notify_on);
            }
        }
        SettingsAction::Ban { user, windows } => {
            let windows = windows
                .as_deref()
                .map(parse_windows)
                .transpose()?
                .unwrap_or_default();
            let outcome = tracker.set_banned_windows(&user, windows)?;
            ctx.print_outcome(&outcome)?;
        }
    }
    Ok(())
}
