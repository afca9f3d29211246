//! LaddaHär Core Library
//!
//! Models, local storage and hub synchronization for a shared EV charging
//! tracker.

pub mod hub;
pub mod models;
pub mod state;
pub mod storage;
pub mod sync;
pub mod tracker;

pub use hub::{HubClient, HubError, JsonBlobClient, MemoryHub, DEFAULT_HUB_URL};
pub use models::{
    Car, CarPreset, ChargingSession, Settings, SharedSettings, Snapshot, SyncedDocument, User,
    CAR_PRESETS, DEFAULT_KWH_PRICE,
};
pub use state::{DomainState, MonthlySummary, StateError, UserUpdate};
pub use storage::{LocalStore, StorageError, StoreKey};
pub use sync::{
    Poller, PullOutcome, PushOutcome, PushTicket, StatusReport, SyncEngine, SyncError,
    SyncOptions, SyncStatus,
};
pub use tracker::{Change, PendingPush, Tracker, TrackerError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
