use crate::models::SyncedDocument;

/// Hub connection details the engine hands back after every operation, so
/// they can be persisted alongside the settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncRecord {
    pub cloud_id: Option<String>,
    pub last_sync_timestamp: Option<i64>,
    pub message: Option<String>,
}

/// The side of the application the engine writes into.
///
/// Both methods are called while the engine holds its own state lock, so
/// implementations must not call back into the engine.
pub trait SyncTarget: Send + Sync {
    /// Replaces users, sessions and price wholesale with a remote document.
    fn apply_remote(&self, document: &SyncedDocument);

    /// Stores the engine's connection details.
    fn record_sync(&self, record: &SyncRecord);
}
