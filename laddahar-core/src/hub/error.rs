use thiserror::Error;

/// Errors returned by hub clients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    #[error("Hub document not found: {0}")]
    NotFound(String),

    #[error("Hub request failed: {0}")]
    Transport(String),

    #[error("Hub returned status {0}")]
    Status(u16),

    #[error("Malformed hub response: {0}")]
    Malformed(String),

    #[error("Hub did not return an id for the new document")]
    MissingId,
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Transport(e.to_string())
    }
}
