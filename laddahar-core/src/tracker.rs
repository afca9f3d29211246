//! Wires the domain state, the local store and the sync engine together.
//!
//! Every user mutation follows the same path: mutate a copy of the state,
//! persist it, commit it, then hand the new snapshot to the engine for a
//! background push if a hub is connected.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::hub::HubClient;
use crate::models::{SyncedDocument, User};
use crate::state::{DomainState, MonthlySummary, StateError, UserUpdate};
use crate::storage::{LocalStore, StorageError};
use crate::sync::{
    Clock, Poller, PullOutcome, PushOutcome, StatusReport, SyncEngine, SyncError, SyncOptions,
    SyncRecord, SyncTarget, SystemClock,
};

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// A push started by a mutation. Drop it to let the push run detached, or
/// wait for it.
#[derive(Debug)]
pub struct PendingPush(Option<JoinHandle<Result<PushOutcome, SyncError>>>);

impl PendingPush {
    /// True if a hub is connected and a push was started.
    pub fn is_scheduled(&self) -> bool {
        self.0.is_some()
    }

    /// Waits for the push. Returns `None` if no push was started.
    pub async fn wait(self) -> Option<Result<PushOutcome, SyncError>> {
        let handle = self.0?;
        Some(match handle.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::Transport(format!("push task failed: {}", e))),
        })
    }
}

/// The result of a mutation, and the push it triggered.
#[derive(Debug)]
pub struct Change<T> {
    pub value: T,
    pub push: PendingPush,
}

/// State shared between the tracker and the engine.
struct Shared {
    state: Mutex<DomainState>,
    store: LocalStore,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DomainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &DomainState) {
        if let Err(e) = self.store.save(state) {
            tracing::warn!("Failed to persist state: {}", e);
        }
    }
}

impl SyncTarget for Shared {
    fn apply_remote(&self, document: &SyncedDocument) {
        let mut state = self.lock();
        state.apply_remote(document);
        self.persist(&state);
    }

    fn record_sync(&self, record: &SyncRecord) {
        let mut state = self.lock();
        state.settings.cloud_id = record.cloud_id.clone();
        state.settings.last_sync_timestamp = record.last_sync_timestamp;
        state.settings.last_sync_status = record.message.clone();
        self.persist(&state);
    }
}

/// The charging tracker.
#[derive(Clone)]
pub struct Tracker {
    shared: Arc<Shared>,
    engine: SyncEngine,
}

impl Tracker {
    /// Loads state from the store and sets up sync with the stored hub id.
    pub fn open(
        store: LocalStore,
        hub: Arc<dyn HubClient>,
        options: SyncOptions,
    ) -> Result<Self, TrackerError> {
        Self::open_with_clock(store, hub, options, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        store: LocalStore,
        hub: Arc<dyn HubClient>,
        options: SyncOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrackerError> {
        let state = store.load()?;
        tracing::debug!(
            "Loaded {} users and {} sessions from {}",
            state.users.len(),
            state.sessions.len(),
            store.data_dir().display()
        );

        let settings = state.settings.clone();
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            store,
        });
        let engine = SyncEngine::with_clock(hub, shared.clone(), &settings, options, clock);

        Ok(Self { shared, engine })
    }

    /// A copy of the current state.
    pub fn state(&self) -> DomainState {
        self.shared.lock().clone()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn status(&self) -> StatusReport {
        self.engine.status()
    }

    pub fn find_user(&self, key: &str) -> Option<User> {
        self.shared.lock().find_user(key).cloned()
    }

    pub fn monthly_summary(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, TrackerError> {
        Ok(self.shared.lock().monthly_summary(user_id, year, month)?)
    }

    /// Flips the charging session for a user and day. The value is `true`
    /// if a session was added.
    pub fn toggle_session(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Change<bool>, TrackerError> {
        self.mutate(|state| state.toggle_session(user_id, date))
    }

    pub fn add_user(&self, user: User) -> Result<Change<User>, TrackerError> {
        self.mutate(|state| state.add_user(user))
    }

    pub fn update_user(&self, id: &str, update: UserUpdate) -> Result<Change<User>, TrackerError> {
        self.mutate(|state| state.update_user(id, update))
    }

    /// Deletes a user and all of their sessions.
    pub fn delete_user(&self, id: &str) -> Result<Change<User>, TrackerError> {
        self.mutate(|state| state.delete_user(id))
    }

    pub fn set_kwh_price(&self, price: f64) -> Result<Change<()>, TrackerError> {
        self.mutate(|state| state.set_kwh_price(price))
    }

    /// Connects to a hub and replaces local data with the hub's.
    pub async fn connect(&self, id: &str) -> Result<PullOutcome, SyncError> {
        self.engine.connect(id).await
    }

    /// Seeds the connected hub with the local data.
    pub async fn initialize(&self) -> Result<PushOutcome, SyncError> {
        let snapshot = self.shared.lock().snapshot();
        self.engine.initialize(snapshot).await
    }

    /// Creates a new hub holding the local data and connects to it.
    pub async fn create_hub(&self) -> Result<String, SyncError> {
        let snapshot = self.shared.lock().snapshot();
        self.engine.create_remote(snapshot).await
    }

    /// Pulls from the connected hub. With `force` the document is applied
    /// even if it isn't newer.
    pub async fn pull(&self, force: bool) -> Result<PullOutcome, SyncError> {
        if force {
            let id = self.engine.cloud_id().ok_or(SyncError::NotConfigured)?;
            self.engine.pull(Some(&id)).await
        } else {
            self.engine.pull(None).await
        }
    }

    /// Pushes the current local data to the connected hub.
    pub async fn push(&self) -> Result<PushOutcome, SyncError> {
        let snapshot = self.shared.lock().snapshot();
        self.engine.push(snapshot, None).await
    }

    pub fn disconnect(&self) {
        self.engine.disconnect();
    }

    /// Starts routine pulls at the configured interval.
    pub fn start_polling(&self) -> Poller {
        Poller::spawn(self.engine.clone(), self.engine.options().poll_interval)
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut DomainState) -> Result<T, StateError>,
    ) -> Result<Change<T>, TrackerError> {
        let (value, snapshot, ticket) = {
            let mut state = self.shared.lock();
            let mut next = state.clone();
            let value = apply(&mut next)?;
            self.shared.store.save(&next)?;
            *state = next;
            // Lock-free, so push revisions follow commit order
            let ticket = self.engine.reserve_push();
            (value, state.snapshot(), ticket)
        };

        // The state lock is released before the engine's own lock is taken
        let push = PendingPush(self.engine.schedule_reserved_push(snapshot, ticket));
        Ok(Change { value, push })
    }
}
