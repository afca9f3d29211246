//! Background task that pulls from the hub at a fixed interval.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::{PullOutcome, SyncEngine};
use super::error::SyncError;

/// Handle to a running poller. The poller stops when the handle is dropped.
#[derive(Debug)]
pub struct Poller {
    handle: JoinHandle<()>,
    interval: Duration,
}

impl Poller {
    /// Starts routine pulls every `interval`. The first pull happens
    /// immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: SyncEngine, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match engine.pull(None).await {
                    Ok(PullOutcome::Applied { timestamp }) => {
                        tracing::info!("Poll applied hub document (ts {})", timestamp);
                    }
                    Ok(outcome) => tracing::debug!("Poll: {:?}", outcome),
                    // Local-only mode, nothing to do until a hub is connected
                    Err(SyncError::NotConfigured) => {}
                    // Expected until someone seeds the hub
                    Err(SyncError::NotFound(id)) => {
                        tracing::debug!("Poll: hub {} has no document yet", id);
                    }
                    Err(e) => tracing::warn!("Poll failed: {}", e),
                }
            }
        });

        Self { handle, interval }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
