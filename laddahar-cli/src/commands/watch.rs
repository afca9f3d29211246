use std::time::Duration;

use clap::Args;

use laddahar_core::{Poller, SyncError, SyncStatus, Tracker};

use super::hub::format_timestamp;

/// Keep pulling from the hub until Ctrl-C
#[derive(Args)]
pub struct WatchCommand {
    /// Seconds between pulls (default: poll_interval_secs from config)
    #[arg(long, short)]
    pub interval: Option<u64>,
}

impl WatchCommand {
    pub async fn run(&self, tracker: &Tracker) -> Result<(), WatchError> {
        let id = tracker.engine().cloud_id().ok_or(WatchError::NotConnected)?;
        let poller = match self.interval {
            Some(secs) => {
                Poller::spawn(tracker.engine().clone(), Duration::from_secs(secs.max(1)))
            }
            None => tracker.start_polling(),
        };
        let interval = poller.interval();

        println!(
            "Watching hub {} every {}s. Press Ctrl-C to stop.",
            id,
            interval.as_secs()
        );

        let mut ticker = tokio::time::interval(interval);
        let mut last_seen = tracker.status().last_sync_timestamp;

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    break;
                }
                _ = ticker.tick() => {
                    let report = tracker.status();
                    if report.last_sync_timestamp != last_seen {
                        if let Some(ts) = report.last_sync_timestamp {
                            let state = tracker.state();
                            println!(
                                "✓ {} users, {} sessions ({})",
                                state.users.len(),
                                state.sessions.len(),
                                format_timestamp(ts)
                            );
                        }
                        last_seen = report.last_sync_timestamp;
                    }
                    if report.status == SyncStatus::Error {
                        if let Some(message) = report.message {
                            eprintln!("✗ {}", message);
                        }
                    }
                }
            }
        }

        poller.stop();
        println!();
        println!("Stopped.");
        Ok(())
    }
}

/// Errors from watch command
#[derive(Debug)]
pub enum WatchError {
    NotConnected,
    IoError(std::io::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::NotConnected => write!(f, "{}", SyncError::NotConfigured),
            WatchError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for WatchError {}

impl From<std::io::Error> for WatchError {
    fn from(e: std::io::Error) -> Self {
        WatchError::IoError(e)
    }
}
