//! Sync error types.

use crate::hub::HubError;

/// Errors that can occur during sync operations.
///
/// None of these ever reach the domain state; the engine records them as
/// status before returning them.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// No hub id is set
    NotConfigured,
    /// The hub id is valid but has no document yet
    NotFound(String),
    /// Network or server failure
    Transport(String),
    /// The hub answered with something that isn't a synced document
    MalformedResponse(String),
}

impl SyncError {
    /// Returns true for failures that count as hub errors in the status line.
    ///
    /// Not-found and not-configured are expected states, not failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::MalformedResponse(_)
        )
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotConfigured => write!(f, "No hub configured. Connect to a hub first."),
            SyncError::NotFound(id) => write!(f, "Hub '{}' has no document yet", id),
            SyncError::Transport(e) => write!(f, "Hub unreachable: {}", e),
            SyncError::MalformedResponse(e) => write!(f, "Unexpected hub response: {}", e),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<HubError> for SyncError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::NotFound(id) => SyncError::NotFound(id),
            HubError::Transport(e) => SyncError::Transport(e),
            HubError::Status(status) => {
                SyncError::Transport(format!("hub returned status {}", status))
            }
            HubError::Malformed(e) => SyncError::MalformedResponse(e),
            HubError::MissingId => SyncError::MalformedResponse(e.to_string()),
        }
    }
}
