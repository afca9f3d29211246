use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use laddahar_core::{JsonBlobClient, LocalStore, Tracker};

mod commands;
mod config;

use commands::{
    CarsCommand, ChargeCommand, ConfigCommand, HubCommand, SettingsCommand, UserCommand,
    WatchCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "ladda")]
#[command(version)]
#[command(about = "Track shared EV charging and split the electricity cost", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the people sharing the charger
    User(UserCommand),

    /// List car presets
    Cars(CarsCommand),

    /// Record charging days and see monthly costs
    Charge(ChargeCommand),

    /// Show or change the shared price
    Settings(SettingsCommand),

    /// Share data through a hub
    Hub(HubCommand),

    /// Follow hub changes until Ctrl-C
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladda=warn,laddahar_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for config commands
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    match command {
        Commands::Cars(cmd) => cmd.run(),
        Commands::Config(cmd) => cmd.run(&config, cli_config_path)?,
        Commands::User(cmd) => cmd.run(&open_tracker(&config)?).await?,
        Commands::Charge(cmd) => cmd.run(&open_tracker(&config)?).await?,
        Commands::Settings(cmd) => cmd.run(&open_tracker(&config)?).await?,
        Commands::Hub(cmd) => cmd.run(&open_tracker(&config)?).await?,
        Commands::Watch(cmd) => cmd.run(&open_tracker(&config)?).await?,
    }

    Ok(())
}

fn open_tracker(config: &Config) -> Result<Tracker, Box<dyn std::error::Error>> {
    tracing::debug!(
        "Opening data dir {} with hub API {}",
        config.data_dir.value.display(),
        config.hub_url.value
    );

    let store = LocalStore::new(config.data_dir.value.clone());
    let hub = JsonBlobClient::new(config.hub_url.value.clone())?;
    Ok(Tracker::open(store, Arc::new(hub), config.sync_options())?)
}
