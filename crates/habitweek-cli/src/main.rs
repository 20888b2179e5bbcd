use clap::{Parser, Subcommand};
use habitweek_core::Config;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitweek", version, about = "Habitweek CLI: weekly calendar and habit distribution")]
struct Cli {
    /// Print results as JSON (default comes from `report.json`)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Weekly calendar of fixed events
    Calendar {
        #[command(subcommand)]
        action: commands::calendar::CalendarAction,
    },
    /// Habit management and distribution
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Per-user settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays parseable. `HABITWEEK_LOG` overrides
/// the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("HABITWEEK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(&config.logging.level);
    if let Some(e) = load_error {
        warn!(error = %e, "config unreadable, using default configuration");
    }

    let ctx = commands::Context {
        json: cli.json || config.report.json,
        config,
    };
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action, &ctx),
        Commands::Calendar { action } => commands::calendar::run(action, &ctx),
        Commands::Habit { action } => commands::habit::run(action, &ctx),
        Commands::Settings { action } => commands::settings::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
