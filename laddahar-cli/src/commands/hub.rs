use chrono::{DateTime, Local};
use clap::{Args, Subcommand};

use laddahar_core::{PullOutcome, PushOutcome, SyncError, Tracker};

use super::confirm;

#[derive(Args)]
pub struct HubCommand {
    #[command(subcommand)]
    pub command: HubSubcommand,
}

#[derive(Subcommand)]
pub enum HubSubcommand {
    /// Show the hub connection and last sync
    Status,

    /// Connect to an existing hub and replace local data with its data
    Connect {
        /// Hub id
        id: String,

        /// Skip confirmations
        #[arg(long, short)]
        yes: bool,
    },

    /// Upload local data to the connected hub
    Init,

    /// Create a new hub from local data and connect to it
    Create,

    /// Fetch data from the hub
    Pull {
        /// Apply the hub data even if it is not newer than the last sync
        #[arg(long, short)]
        force: bool,
    },

    /// Upload local data to the hub
    Push,

    /// Stop syncing. Local data is kept.
    Disconnect,
}

impl HubCommand {
    pub async fn run(&self, tracker: &Tracker) -> Result<(), HubCommandError> {
        match &self.command {
            HubSubcommand::Status => {
                self.status(tracker);
                Ok(())
            }
            HubSubcommand::Connect { id, yes } => self.connect(tracker, id, *yes).await,
            HubSubcommand::Init => {
                if let PushOutcome::Pushed { timestamp } = tracker.initialize().await? {
                    println!("✓ Uploaded local data ({})", format_timestamp(timestamp));
                }
                Ok(())
            }
            HubSubcommand::Create => {
                let id = tracker.create_hub().await?;
                println!("✓ Created hub {}", id);
                println!();
                println!("Others can join with:");
                println!("  ladda hub connect {}", id);
                Ok(())
            }
            HubSubcommand::Pull { force } => {
                let outcome = tracker.pull(*force).await?;
                print_pull(tracker, outcome);
                Ok(())
            }
            HubSubcommand::Push => {
                if let PushOutcome::Pushed { timestamp } = tracker.push().await? {
                    println!("✓ Pushed local data ({})", format_timestamp(timestamp));
                }
                Ok(())
            }
            HubSubcommand::Disconnect => {
                if tracker.engine().cloud_id().is_none() {
                    println!("Not connected to a hub.");
                    return Ok(());
                }
                tracker.disconnect();
                println!("✓ Disconnected. Data stays on this device.");
                Ok(())
            }
        }
    }

    fn status(&self, tracker: &Tracker) {
        let report = tracker.status();

        println!("Hub");
        println!("===");
        println!();
        match &report.cloud_id {
            Some(id) => println!("Hub id:     {}", id),
            None => {
                println!("Not connected. Data is kept on this device only.");
                println!();
                println!("Create a hub with:  ladda hub create");
                println!("Or join one with:   ladda hub connect <id>");
                return;
            }
        }
        match report.last_sync_timestamp {
            Some(ts) => println!("Last sync:  {}", format_timestamp(ts)),
            None => println!("Last sync:  never"),
        }
        if let Some(message) = tracker.state().settings.last_sync_status {
            println!("Status:     {}", message);
        }
    }

    async fn connect(&self, tracker: &Tracker, id: &str, yes: bool) -> Result<(), HubCommandError> {
        let state = tracker.state();
        if !yes
            && !state.users.is_empty()
            && !confirm("Connecting replaces local users and sessions with the hub's. Continue?")?
        {
            println!("Cancelled.");
            return Ok(());
        }

        match tracker.connect(id).await {
            Ok(outcome) => {
                print_pull(tracker, outcome);
                Ok(())
            }
            Err(SyncError::NotFound(id)) => {
                println!("Hub {} has no data yet.", id);
                if yes || confirm("Upload local data to it?")? {
                    if let PushOutcome::Pushed { timestamp } = tracker.initialize().await? {
                        println!("✓ Uploaded local data ({})", format_timestamp(timestamp));
                    }
                } else {
                    println!("Connected. Run 'ladda hub init' to upload local data later.");
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn print_pull(tracker: &Tracker, outcome: PullOutcome) {
    match outcome {
        PullOutcome::Applied { timestamp } => {
            let state = tracker.state();
            println!(
                "✓ Synced {} users and {} sessions ({})",
                state.users.len(),
                state.sessions.len(),
                format_timestamp(timestamp)
            );
        }
        PullOutcome::Stale { .. } => println!("Already up to date."),
        PullOutcome::Skipped => println!("Another sync is in progress. Try again."),
        PullOutcome::Superseded => println!("The hub changed while pulling. Nothing applied."),
    }
}

/// Formats a sync timestamp (milliseconds) in local time.
pub(crate) fn format_timestamp(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => millis.to_string(),
    }
}

/// Errors from hub command
#[derive(Debug)]
pub enum HubCommandError {
    SyncError(SyncError),
    IoError(std::io::Error),
}

impl std::fmt::Display for HubCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubCommandError::SyncError(e) => write!(f, "{}", e),
            HubCommandError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for HubCommandError {}

impl From<SyncError> for HubCommandError {
    fn from(e: SyncError) -> Self {
        HubCommandError::SyncError(e)
    }
}

impl From<std::io::Error> for HubCommandError {
    fn from(e: std::io::Error) -> Self {
        HubCommandError::IoError(e)
    }
}
