//! Hub synchronization.
//!
//! The [`SyncEngine`] keeps the local state and one shared hub document
//! converged with a last-write-wins policy keyed on the document timestamp.
//!
//! ## Triggers
//!
//! 1. Every local mutation pushes the just-computed state (see
//!    [`SyncEngine::schedule_push`]).
//! 2. A [`Poller`] pulls at a fixed interval; only strictly newer documents
//!    are applied.
//! 3. Connecting to a hub pulls explicitly and always applies. If the hub has
//!    no document yet, [`SyncEngine::initialize`] seeds it.

mod clock;
mod engine;
mod error;
mod poller;
mod status;
mod target;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    PullOutcome, PushOutcome, PushTicket, SyncEngine, SyncOptions, DEFAULT_POLL_INTERVAL,
    DEFAULT_STATUS_RESET_DELAY,
};
pub use error::SyncError;
pub use poller::Poller;
pub use status::{StatusReport, SyncStatus};
pub use target::{SyncRecord, SyncTarget};
