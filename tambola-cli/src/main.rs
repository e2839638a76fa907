mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use std::path::PathBuf;
use tambola_core::{PlayerName, Session, StoreBackend, SvgSurface, TambolaConfig, TambolaError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tambola")]
#[command(about = "Tambola - mark your ticket and play with friends")]
#[command(version)]
struct Cli {
    /// Data directory for local storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Shared game database (defaults to games.db in the data directory)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Display name for this session (random if omitted)
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ticket image and mark commands
    #[command(subcommand)]
    Ticket(commands::TicketCommands),

    /// Game lobby commands
    #[command(subcommand)]
    Game(commands::GameCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cli_config = CliConfig::resolve(cli.data_dir, cli.store, cli.verbose);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(cli_config.log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&cli_config.data_dir).await?;

    let mut config = TambolaConfig::load_or_default(&cli_config.data_dir).await?;
    if let Some(store_path) = cli_config.store_path.clone() {
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = Some(store_path);
    }
    tracing::debug!(
        "Data dir {}, game store {:?}",
        cli_config.data_dir.display(),
        config.store.path
    );

    let identity = cli.name.map(PlayerName::new);
    let mut session = Session::init(&config, SvgSurface::new(), identity).await?;

    // Execute command
    let result = match cli.command {
        Commands::Ticket(cmd) => commands::handle_ticket_command(cmd, &mut session).await,
        Commands::Game(cmd) => commands::handle_game_command(cmd, &mut session).await,
    };

    session.teardown();

    if let Err(e) = result {
        match e {
            TambolaError::GameNotFound { code } => {
                eprintln!("Game not found!");
                eprintln!("No game uses the code '{}'", code);
            }
            TambolaError::StoreUnavailable => {
                eprintln!("Error: the game store is not available");
                eprintln!("Check the --store path or the store settings in config.json");
            }
            TambolaError::TicketNotLoaded => {
                eprintln!("Error: no ticket loaded");
                eprintln!("Use 'tambola ticket load <image>' first");
            }
            TambolaError::StorageRead(reason) => {
                eprintln!("Error: saved marks could not be read: {}", reason);
                eprintln!("Use 'tambola ticket load <image>' to start over");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
