use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "pomodoro", version, about = "Pomodoro timer for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the pomodoro timer (default)
    Start(commands::start::StartArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Create or update the config file interactively
    Init,
    /// Print the effective configuration as JSON
    Status(commands::start::StartArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("POMODORO_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Start(commands::start::StartArgs::default()));
    let result = match command {
        Commands::Start(args) => commands::start::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Init => commands::init::run(),
        Commands::Status(args) => commands::status::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
