//! Last-write-wins replication between the local state and a hub document.
//!
//! # Ordering
//!
//! Every pushed document carries a millisecond timestamp. A routine pull only
//! applies a document whose timestamp is strictly greater than the last one
//! pushed or applied here, so a slow response can never overwrite newer data.
//! Explicit pulls (connecting to a hub) always apply.
//!
//! # Scheduling
//!
//! - Pushes are serialized. A queued push whose snapshot was superseded by a
//!   later mutation is skipped; the later push carries the newer state.
//! - A routine pull is skipped while any other operation is in flight.
//! - Changing the hub id bumps a generation counter. Results of operations
//!   started under an older generation are discarded, and a push reserved
//!   before the switch never reaches the new hub.
//!
//! Failed pushes are not retried. The next mutation pushes the full state
//! again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::clock::{Clock, SystemClock};
use super::error::SyncError;
use super::status::{StatusReport, SyncStatus};
use super::target::{SyncRecord, SyncTarget};
use crate::hub::{HubClient, HubError};
use crate::models::{Settings, Snapshot, SyncedDocument};

/// How long a success or error status stays up before returning to idle.
pub const DEFAULT_STATUS_RESET_DELAY: Duration = Duration::from_secs(3);
/// Interval between routine pulls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOptions {
    pub status_reset_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            status_reset_delay: DEFAULT_STATUS_RESET_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The document was written with this timestamp
    Pushed { timestamp: i64 },
    /// A newer snapshot was queued before this one got its turn
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote document replaced the local state
    Applied { timestamp: i64 },
    /// The remote document was not newer than what we already have
    Stale { remote: i64, local: Option<i64> },
    /// Another operation was in flight
    Skipped,
    /// The hub id changed while the pull was in flight
    Superseded,
}

/// A push slot, reserved when the snapshot to push was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushTicket {
    revision: u64,
    generation: u64,
}

#[derive(Debug, Default)]
struct EngineState {
    cloud_id: Option<String>,
    last_sync_timestamp: Option<i64>,
    status: SyncStatus,
    message: Option<String>,
    status_seq: u64,
    in_flight: usize,
}

impl EngineState {
    fn record(&self) -> SyncRecord {
        SyncRecord {
            cloud_id: self.cloud_id.clone(),
            last_sync_timestamp: self.last_sync_timestamp,
            message: self.message.clone(),
        }
    }
}

struct Inner {
    hub: Arc<dyn HubClient>,
    target: Arc<dyn SyncTarget>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
    state: Mutex<EngineState>,
    op_lock: tokio::sync::Mutex<()>,
    /// Bumped whenever the hub id changes, while `state` is held
    generation: AtomicU64,
    push_revision: AtomicU64,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The sync engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Creates an engine using the hub settings from `settings`.
    pub fn new(
        hub: Arc<dyn HubClient>,
        target: Arc<dyn SyncTarget>,
        settings: &Settings,
        options: SyncOptions,
    ) -> Self {
        Self::with_clock(hub, target, settings, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        hub: Arc<dyn HubClient>,
        target: Arc<dyn SyncTarget>,
        settings: &Settings,
        options: SyncOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = EngineState {
            cloud_id: settings.hub_id().map(str::to_string),
            last_sync_timestamp: settings.last_sync_timestamp,
            message: settings.last_sync_status.clone(),
            ..EngineState::default()
        };

        Self {
            inner: Arc::new(Inner {
                hub,
                target,
                clock,
                options,
                state: Mutex::new(state),
                op_lock: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                push_revision: AtomicU64::new(0),
            }),
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.inner.options
    }

    pub fn cloud_id(&self) -> Option<String> {
        self.inner.lock_state().cloud_id.clone()
    }

    pub fn last_sync_timestamp(&self) -> Option<i64> {
        self.inner.lock_state().last_sync_timestamp
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lock_state().in_flight > 0
    }

    pub fn status(&self) -> StatusReport {
        let state = self.inner.lock_state();
        StatusReport {
            status: state.status,
            message: state.message.clone(),
            cloud_id: state.cloud_id.clone(),
            last_sync_timestamp: state.last_sync_timestamp,
            busy: state.in_flight > 0,
        }
    }

    /// Switches to another hub, or to local-only mode with `None`.
    ///
    /// In-flight operations against the previous hub are invalidated, and the
    /// recorded timestamp is cleared since it belonged to the old document.
    pub fn set_cloud_id(&self, cloud_id: Option<String>) {
        let cloud_id = cloud_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let mut state = self.inner.lock_state();
        if state.cloud_id == cloud_id {
            return;
        }

        tracing::info!(
            "Hub changed from {:?} to {:?}",
            state.cloud_id.as_deref(),
            cloud_id.as_deref()
        );
        state.cloud_id = cloud_id;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        state.last_sync_timestamp = None;
        state.message = None;
        self.inner.target.record_sync(&state.record());
    }

    /// Leaves the hub. Local data is kept.
    pub fn disconnect(&self) {
        self.set_cloud_id(None);
    }

    /// Connects to a hub: adopts `id` and pulls from it unconditionally.
    ///
    /// Returns [`SyncError::NotFound`] if the hub has no document yet; the
    /// caller can then offer [`SyncEngine::initialize`].
    pub async fn connect(&self, id: &str) -> Result<PullOutcome, SyncError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(SyncError::NotConfigured);
        }

        self.set_cloud_id(Some(id.to_string()));
        self.pull(Some(id)).await
    }

    /// Seeds the configured hub with the local state.
    pub async fn initialize(&self, snapshot: Snapshot) -> Result<PushOutcome, SyncError> {
        let id = self.cloud_id().ok_or(SyncError::NotConfigured)?;
        self.push(snapshot, Some(&id)).await
    }

    /// Pushes a snapshot to the hub.
    ///
    /// `target_id` overrides the configured hub id.
    pub async fn push(
        &self,
        snapshot: Snapshot,
        target_id: Option<&str>,
    ) -> Result<PushOutcome, SyncError> {
        let ticket = self.reserve_push();
        self.push_reserved(snapshot, target_id, ticket).await
    }

    /// Reserves the next push slot for a snapshot that was just computed.
    ///
    /// Takes no locks, so it can be called while the caller holds its own
    /// state lock. Reserving in the same critical section that produced the
    /// snapshot keeps revisions in snapshot order. The ticket also pins the
    /// current hub: if the hub changes before the push runs, it is dropped.
    pub fn reserve_push(&self) -> PushTicket {
        PushTicket {
            revision: self.inner.push_revision.fetch_add(1, Ordering::SeqCst) + 1,
            generation: self.inner.generation.load(Ordering::SeqCst),
        }
    }

    /// Pushes `snapshot` in the background, if a hub is configured.
    ///
    /// The snapshot should be the state computed by the mutation that
    /// triggered the push, not a later read. Returns `None` in local-only
    /// mode or outside a tokio runtime.
    pub fn schedule_push(
        &self,
        snapshot: Snapshot,
    ) -> Option<JoinHandle<Result<PushOutcome, SyncError>>> {
        let ticket = self.reserve_push();
        self.schedule_reserved_push(snapshot, ticket)
    }

    /// Like [`SyncEngine::schedule_push`], with a ticket taken earlier by
    /// [`SyncEngine::reserve_push`].
    pub fn schedule_reserved_push(
        &self,
        snapshot: Snapshot,
        ticket: PushTicket,
    ) -> Option<JoinHandle<Result<PushOutcome, SyncError>>> {
        self.cloud_id()?;

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime, change not pushed to hub");
                return None;
            }
        };

        let engine = self.clone();
        Some(runtime.spawn(async move { engine.push_reserved(snapshot, None, ticket).await }))
    }

    async fn push_reserved(
        &self,
        snapshot: Snapshot,
        target_id: Option<&str>,
        ticket: PushTicket,
    ) -> Result<PushOutcome, SyncError> {
        let explicit = target_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        if explicit.is_none() && self.cloud_id().is_none() {
            return Err(SyncError::NotConfigured);
        }

        let _turn = self.inner.op_lock.lock().await;
        if ticket.revision < self.inner.push_revision.load(Ordering::SeqCst) {
            tracing::debug!(
                "Skipping push of revision {}, newer one queued",
                ticket.revision
            );
            return Ok(PushOutcome::Superseded);
        }

        // The hub id is read under the same lock that checks the generation,
        // so it is the hub that was current when the ticket was reserved.
        let (id, timestamp) = {
            let mut state = self.inner.lock_state();
            if self.inner.generation.load(Ordering::SeqCst) != ticket.generation {
                tracing::debug!(
                    "Dropping push of revision {}, hub changed since it was queued",
                    ticket.revision
                );
                return Ok(PushOutcome::Superseded);
            }
            let id = explicit
                .or_else(|| state.cloud_id.clone())
                .ok_or(SyncError::NotConfigured)?;
            let timestamp = self.next_timestamp(&state);
            self.start_op(&mut state);
            (id, timestamp)
        };

        let document = SyncedDocument::stamp(snapshot, timestamp);
        let result = match serde_json::to_value(&document) {
            Ok(payload) => self.inner.hub.put_document(&id, &payload).await,
            Err(e) => Err(HubError::Malformed(e.to_string())),
        };

        let mut state = self.inner.lock_state();
        if !self.end_op(&mut state, ticket.generation) {
            return Ok(PushOutcome::Superseded);
        }

        match result {
            Ok(()) => {
                tracing::info!("Pushed document to hub {} (ts {})", id, timestamp);
                state.last_sync_timestamp = Some(
                    state
                        .last_sync_timestamp
                        .map_or(timestamp, |last| last.max(timestamp)),
                );
                self.complete(&mut state, SyncStatus::Success, format!("Saved to hub {}", id));
                Ok(PushOutcome::Pushed { timestamp })
            }
            Err(e) => {
                let err = SyncError::from(e);
                tracing::warn!("Push to hub {} failed: {}", id, err);
                self.complete(&mut state, SyncStatus::Error, format!("Push failed: {}", err));
                Err(err)
            }
        }
    }

    /// Pulls the hub document.
    ///
    /// With `target_id` the pull is explicit: it bypasses the operation lock
    /// and applies the document even if it is not newer. Without it, this is
    /// a routine pull against the configured hub.
    pub async fn pull(&self, target_id: Option<&str>) -> Result<PullOutcome, SyncError> {
        let explicit = target_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let id = explicit
            .clone()
            .or_else(|| self.cloud_id())
            .ok_or(SyncError::NotConfigured)?;

        let _turn = if explicit.is_some() {
            None
        } else {
            match self.inner.op_lock.try_lock() {
                Ok(guard) if !self.is_busy() => Some(guard),
                _ => {
                    tracing::debug!("Skipping routine pull, another operation is in flight");
                    return Ok(PullOutcome::Skipped);
                }
            }
        };

        let generation = self.begin_op();
        let result = self.inner.hub.fetch_document(&id).await;

        let mut state = self.inner.lock_state();
        if !self.end_op(&mut state, generation) {
            tracing::debug!("Discarding pull from hub {}, hub changed meanwhile", id);
            return Ok(PullOutcome::Superseded);
        }

        let value = match result {
            Ok(Some(value)) => value,
            Ok(None) => {
                self.complete(
                    &mut state,
                    SyncStatus::Idle,
                    format!("Hub {} has no document yet", id),
                );
                return Err(SyncError::NotFound(id));
            }
            Err(e) => {
                let err = SyncError::from(e);
                tracing::warn!("Pull from hub {} failed: {}", id, err);
                self.complete(&mut state, SyncStatus::Error, format!("Pull failed: {}", err));
                return Err(err);
            }
        };

        let document: SyncedDocument = match serde_json::from_value(value) {
            Ok(document) => document,
            Err(e) => {
                let err = SyncError::MalformedResponse(e.to_string());
                tracing::warn!("Hub {} returned an unexpected document: {}", id, err);
                self.complete(&mut state, SyncStatus::Error, format!("Pull failed: {}", err));
                return Err(err);
            }
        };

        let local = state.last_sync_timestamp;
        let newer = local.map_or(true, |last| document.timestamp > last);
        if !newer && explicit.is_none() {
            tracing::debug!(
                "Discarding stale document from hub {} (ts {} <= {:?})",
                id,
                document.timestamp,
                local
            );
            if state.status == SyncStatus::Syncing && state.in_flight == 0 {
                state.status = SyncStatus::Idle;
            }
            return Ok(PullOutcome::Stale {
                remote: document.timestamp,
                local,
            });
        }

        tracing::info!(
            "Applying document from hub {} (ts {}, {} users, {} sessions)",
            id,
            document.timestamp,
            document.users.len(),
            document.sessions.len()
        );
        self.inner.target.apply_remote(&document);
        state.last_sync_timestamp = Some(document.timestamp);
        self.complete(&mut state, SyncStatus::Success, format!("Synced from hub {}", id));

        Ok(PullOutcome::Applied {
            timestamp: document.timestamp,
        })
    }

    /// Creates a new hub document from the snapshot and switches to it.
    ///
    /// On failure the hub id and timestamp are left untouched.
    pub async fn create_remote(&self, snapshot: Snapshot) -> Result<String, SyncError> {
        let timestamp = self.inner.clock.now_millis();
        let document = SyncedDocument::stamp(snapshot, timestamp);
        let payload = serde_json::to_value(&document)
            .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;

        let generation = self.begin_op();
        let result = self.inner.hub.create_document(&payload).await;

        let mut state = self.inner.lock_state();
        self.end_op(&mut state, generation);

        match result {
            Ok(id) => {
                tracing::info!("Created hub {}", id);
                state.cloud_id = Some(id.clone());
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                state.last_sync_timestamp = Some(timestamp);
                self.complete(&mut state, SyncStatus::Success, format!("Created hub {}", id));
                Ok(id)
            }
            Err(e) => {
                let err = SyncError::from(e);
                tracing::warn!("Creating hub failed: {}", err);
                self.complete(
                    &mut state,
                    SyncStatus::Error,
                    format!("Could not create hub: {}", err),
                );
                Err(err)
            }
        }
    }

    /// Current wall-clock time, but never at or below the last recorded
    /// timestamp.
    fn next_timestamp(&self, state: &EngineState) -> i64 {
        let now = self.inner.clock.now_millis();
        match state.last_sync_timestamp {
            Some(last) if now <= last => last + 1,
            _ => now,
        }
    }

    fn begin_op(&self) -> u64 {
        let mut state = self.inner.lock_state();
        self.start_op(&mut state);
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn start_op(&self, state: &mut EngineState) {
        state.in_flight += 1;
        state.status = SyncStatus::Syncing;
        state.status_seq += 1;
    }

    /// Marks an operation finished. Returns false if it was superseded.
    fn end_op(&self, state: &mut EngineState, generation: u64) -> bool {
        state.in_flight = state.in_flight.saturating_sub(1);
        if self.inner.generation.load(Ordering::SeqCst) == generation {
            return true;
        }

        if state.in_flight == 0 && state.status == SyncStatus::Syncing {
            state.status = SyncStatus::Idle;
        }
        false
    }

    fn complete(&self, state: &mut EngineState, status: SyncStatus, message: String) {
        state.status = status;
        state.message = Some(message);
        state.status_seq += 1;
        self.inner.target.record_sync(&state.record());

        if status != SyncStatus::Idle {
            schedule_idle_reset(
                Arc::downgrade(&self.inner),
                state.status_seq,
                self.inner.options.status_reset_delay,
            );
        }
    }
}

/// Puts the status back to idle after `delay`, unless something else has
/// changed it in the meantime.
fn schedule_idle_reset(inner: Weak<Inner>, seq: u64, delay: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };

    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(inner) = inner.upgrade() {
            let mut state = inner.lock_state();
            if state.status_seq == seq && state.in_flight == 0 {
                state.status = SyncStatus::Idle;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::MemoryHub;
    use crate::models::{Car, ChargingSession, User};
    use crate::state::DomainState;
    use crate::sync::clock::ManualClock;
    use chrono::NaiveDate;
    use serde_json::json;

    /// Target that keeps the applied state in memory.
    #[derive(Default)]
    struct TestTarget {
        state: Mutex<DomainState>,
        records: Mutex<Vec<SyncRecord>>,
    }

    impl TestTarget {
        fn snapshot(&self) -> Snapshot {
            self.state.lock().unwrap().snapshot()
        }

        fn last_record(&self) -> Option<SyncRecord> {
            self.records.lock().unwrap().last().cloned()
        }
    }

    impl SyncTarget for TestTarget {
        fn apply_remote(&self, document: &SyncedDocument) {
            self.state.lock().unwrap().apply_remote(document);
        }

        fn record_sync(&self, record: &SyncRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    struct Fixture {
        hub: Arc<MemoryHub>,
        target: Arc<TestTarget>,
        clock: Arc<ManualClock>,
        engine: SyncEngine,
    }

    fn fixture(cloud_id: Option<&str>, last_sync_timestamp: Option<i64>) -> Fixture {
        let hub = Arc::new(MemoryHub::new());
        let target = Arc::new(TestTarget::default());
        let clock = Arc::new(ManualClock::new(1_000));
        let settings = Settings {
            cloud_id: cloud_id.map(str::to_string),
            last_sync_timestamp,
            ..Settings::default()
        };
        let options = SyncOptions {
            status_reset_delay: Duration::from_millis(20),
            poll_interval: Duration::from_millis(20),
        };
        let engine = SyncEngine::with_clock(
            hub.clone(),
            target.clone(),
            &settings,
            options,
            clock.clone(),
        );

        Fixture {
            hub,
            target,
            clock,
            engine,
        }
    }

    fn snapshot(name: &str, price: f64) -> Snapshot {
        let user = User::new(name, Car::new("Polestar 2", 78.0)).with_id("1");
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        Snapshot {
            users: vec![user],
            sessions: vec![ChargingSession::new("1", date)],
            kwh_price: price,
        }
    }

    fn remote_doc(name: &str, ts: i64) -> serde_json::Value {
        serde_json::to_value(SyncedDocument::stamp(snapshot(name, 2.0), ts)).unwrap()
    }

    #[tokio::test]
    async fn test_no_hub_means_no_requests() {
        let f = fixture(None, None);

        assert_eq!(
            f.engine.push(snapshot("Erik", 2.5), None).await,
            Err(SyncError::NotConfigured)
        );
        assert_eq!(f.engine.pull(None).await, Err(SyncError::NotConfigured));
        assert!(f.engine.schedule_push(snapshot("Erik", 2.5)).is_none());
        assert_eq!(f.engine.initialize(snapshot("Erik", 2.5)).await, Err(SyncError::NotConfigured));
        assert_eq!(f.engine.connect("  ").await, Err(SyncError::NotConfigured));

        assert_eq!(f.hub.request_count(), 0);
        assert_eq!(f.engine.status().status, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_push_stamps_and_records_timestamp() {
        let f = fixture(Some("team1"), None);

        let outcome = f.engine.push(snapshot("Erik", 2.5), None).await.unwrap();

        assert_eq!(outcome, PushOutcome::Pushed { timestamp: 1_000 });
        assert_eq!(f.engine.last_sync_timestamp(), Some(1_000));
        let stored = f.hub.document("team1").unwrap();
        assert_eq!(stored["ts"], 1_000);
        assert_eq!(stored["settings"]["kwhPrice"], 2.5);

        let status = f.engine.status();
        assert_eq!(status.status, SyncStatus::Success);
        assert_eq!(status.message.as_deref(), Some("Saved to hub team1"));
        assert_eq!(
            f.target.last_record().unwrap().last_sync_timestamp,
            Some(1_000)
        );
    }

    #[tokio::test]
    async fn test_second_push_records_later_timestamp() {
        let f = fixture(Some("team1"), None);

        f.engine.push(snapshot("Erik", 2.5), None).await.unwrap();
        f.clock.advance(10);
        f.engine.push(snapshot("Erik", 2.5), None).await.unwrap();

        assert_eq!(f.engine.last_sync_timestamp(), Some(1_010));
        assert_eq!(f.hub.document("team1").unwrap()["ts"], 1_010);
    }

    #[tokio::test]
    async fn test_push_never_stamps_below_recorded_timestamp() {
        // Clock is behind a document pulled from another machine
        let f = fixture(Some("team1"), Some(5_000));

        let outcome = f.engine.push(snapshot("Erik", 2.5), None).await.unwrap();

        assert_eq!(outcome, PushOutcome::Pushed { timestamp: 5_001 });
    }

    #[tokio::test]
    async fn test_failed_push_keeps_timestamp_and_sets_error() {
        let f = fixture(Some("team1"), Some(500));
        f.hub.set_offline(true);

        let err = f.engine.push(snapshot("Erik", 2.5), None).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(f.engine.last_sync_timestamp(), Some(500));
        let status = f.engine.status();
        assert_eq!(status.status, SyncStatus::Error);
        assert!(status.message.unwrap().starts_with("Push failed"));
        assert!(f.hub.document("team1").is_none());
    }

    #[tokio::test]
    async fn test_status_resets_to_idle() {
        let f = fixture(Some("team1"), None);
        f.engine.push(snapshot("Erik", 2.5), None).await.unwrap();
        assert_eq!(f.engine.status().status, SyncStatus::Success);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = f.engine.status();
        assert_eq!(status.status, SyncStatus::Idle);
        // The message outlives the status
        assert_eq!(status.message.as_deref(), Some("Saved to hub team1"));
    }

    #[tokio::test]
    async fn test_routine_pull_applies_newer_and_discards_stale() {
        let f = fixture(Some("team1"), Some(50));

        f.hub.insert("team1", remote_doc("Anna", 100));
        let outcome = f.engine.pull(None).await.unwrap();
        assert_eq!(outcome, PullOutcome::Applied { timestamp: 100 });
        assert_eq!(f.engine.last_sync_timestamp(), Some(100));
        assert_eq!(f.target.snapshot().users[0].name, "Anna");

        f.hub.insert("team1", remote_doc("Stale", 90));
        let outcome = f.engine.pull(None).await.unwrap();
        assert_eq!(
            outcome,
            PullOutcome::Stale {
                remote: 90,
                local: Some(100)
            }
        );
        assert_eq!(f.engine.last_sync_timestamp(), Some(100));
        assert_eq!(f.target.snapshot().users[0].name, "Anna");
    }

    #[tokio::test]
    async fn test_routine_pull_with_equal_timestamp_is_stale() {
        let f = fixture(Some("team1"), Some(100));
        f.hub.insert("team1", remote_doc("Anna", 100));

        let outcome = f.engine.pull(None).await.unwrap();

        assert!(matches!(outcome, PullOutcome::Stale { .. }));
        assert!(f.target.snapshot().users.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_pull_always_applies() {
        let f = fixture(Some("team1"), Some(100));
        f.hub.insert("team1", remote_doc("Anna", 100));

        let outcome = f.engine.pull(Some("team1")).await.unwrap();

        assert_eq!(outcome, PullOutcome::Applied { timestamp: 100 });
        assert_eq!(f.target.snapshot().users[0].name, "Anna");
    }

    #[tokio::test]
    async fn test_push_then_explicit_pull_round_trip() {
        let f = fixture(Some("team1"), None);
        let pushed = snapshot("Erik", 3.25);

        f.engine.push(pushed.clone(), None).await.unwrap();
        f.engine.pull(Some("team1")).await.unwrap();

        assert_eq!(f.target.snapshot(), pushed);
    }

    #[tokio::test]
    async fn test_pull_not_found_is_not_an_error_status() {
        let f = fixture(Some("team1"), None);

        let err = f.engine.pull(None).await.unwrap_err();

        assert_eq!(err, SyncError::NotFound("team1".to_string()));
        assert!(!err.is_failure());
        let status = f.engine.status();
        assert_eq!(status.status, SyncStatus::Idle);
        assert_eq!(
            status.message.as_deref(),
            Some("Hub team1 has no document yet")
        );
    }

    #[tokio::test]
    async fn test_pull_transport_error_keeps_state() {
        let f = fixture(Some("team1"), Some(10));
        f.hub.insert("team1", remote_doc("Anna", 100));
        f.hub.set_offline(true);

        let err = f.engine.pull(None).await.unwrap_err();

        assert!(err.is_failure());
        assert_eq!(f.engine.status().status, SyncStatus::Error);
        assert_eq!(f.engine.last_sync_timestamp(), Some(10));
        assert!(f.target.snapshot().users.is_empty());
    }

    #[tokio::test]
    async fn test_pull_malformed_document() {
        let f = fixture(Some("team1"), None);
        f.hub.insert("team1", json!({ "hello": "world" }));

        let err = f.engine.pull(None).await.unwrap_err();

        assert!(matches!(err, SyncError::MalformedResponse(_)));
        assert_eq!(f.engine.status().status, SyncStatus::Error);
        assert!(f.target.snapshot().users.is_empty());
    }

    #[tokio::test]
    async fn test_routine_pull_skipped_while_busy() {
        let f = fixture(Some("team1"), None);
        f.hub.insert("team1", remote_doc("Anna", 100));
        f.hub.set_latency(Duration::from_millis(100));

        let engine = f.engine.clone();
        let slow = tokio::spawn(async move { engine.pull(Some("team1")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(f.engine.is_busy());
        assert_eq!(f.engine.pull(None).await.unwrap(), PullOutcome::Skipped);

        let first = slow.await.unwrap().unwrap();
        assert_eq!(first, PullOutcome::Applied { timestamp: 100 });
        assert!(!f.engine.is_busy());
    }

    #[tokio::test]
    async fn test_pull_superseded_by_hub_change() {
        let f = fixture(Some("team1"), None);
        f.hub.insert("team1", remote_doc("Anna", 100));
        f.hub.set_latency(Duration::from_millis(100));

        let engine = f.engine.clone();
        let slow = tokio::spawn(async move { engine.pull(None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        f.engine.set_cloud_id(Some("team2".to_string()));

        assert_eq!(slow.await.unwrap().unwrap(), PullOutcome::Superseded);
        assert!(f.target.snapshot().users.is_empty());
        assert_eq!(f.engine.last_sync_timestamp(), None);
        assert_eq!(f.engine.status().status, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_connect_applies_remote_state() {
        let f = fixture(None, Some(500));
        f.hub.insert("team1", remote_doc("Anna", 100));

        let outcome = f.engine.connect(" team1 ").await.unwrap();

        assert_eq!(outcome, PullOutcome::Applied { timestamp: 100 });
        assert_eq!(f.engine.cloud_id().as_deref(), Some("team1"));
        assert_eq!(f.engine.last_sync_timestamp(), Some(100));
        assert_eq!(f.target.snapshot().users[0].name, "Anna");
        assert_eq!(
            f.target.last_record().unwrap().cloud_id.as_deref(),
            Some("team1")
        );
    }

    #[tokio::test]
    async fn test_connect_to_empty_hub_then_initialize() {
        let f = fixture(None, None);

        let err = f.engine.connect("team1").await.unwrap_err();
        assert_eq!(err, SyncError::NotFound("team1".to_string()));
        assert_eq!(f.engine.cloud_id().as_deref(), Some("team1"));

        let outcome = f.engine.initialize(snapshot("Erik", 2.5)).await.unwrap();
        assert_eq!(outcome, PushOutcome::Pushed { timestamp: 1_000 });
        assert_eq!(f.hub.document("team1").unwrap()["users"][0]["name"], "Erik");
    }

    #[tokio::test]
    async fn test_create_remote_adopts_id() {
        let f = fixture(None, None);

        let id = f.engine.create_remote(snapshot("Erik", 2.5)).await.unwrap();

        assert_eq!(f.engine.cloud_id(), Some(id.clone()));
        assert_eq!(f.engine.last_sync_timestamp(), Some(1_000));
        assert_eq!(f.hub.document(&id).unwrap()["ts"], 1_000);
        assert_eq!(f.engine.status().status, SyncStatus::Success);
    }

    #[tokio::test]
    async fn test_create_remote_failure_changes_nothing() {
        let f = fixture(Some("team1"), Some(77));
        f.hub.set_offline(true);

        let err = f.engine.create_remote(snapshot("Erik", 2.5)).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
        assert_eq!(f.engine.cloud_id().as_deref(), Some("team1"));
        assert_eq!(f.engine.last_sync_timestamp(), Some(77));
        assert_eq!(f.engine.status().status, SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_scheduled_pushes_skip_superseded_snapshots() {
        let f = fixture(Some("team1"), None);

        let first = f.engine.schedule_push(snapshot("Old", 1.0)).unwrap();
        let second = f.engine.schedule_push(snapshot("New", 2.0)).unwrap();

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert!(matches!(second, PushOutcome::Pushed { .. }));
        assert!(matches!(
            first,
            PushOutcome::Superseded | PushOutcome::Pushed { .. }
        ));
        assert_eq!(f.hub.document("team1").unwrap()["users"][0]["name"], "New");
    }

    #[tokio::test]
    async fn test_push_queued_before_connect_never_reaches_new_hub() {
        let f = fixture(Some("team1"), None);
        f.hub.insert("team2", remote_doc("TeamTwo", 100));
        f.hub.set_latency(Duration::from_millis(50));

        let pending = f.engine.schedule_push(snapshot("LocalOld", 1.0)).unwrap();
        let connected = f.engine.connect("team2").await.unwrap();

        assert_eq!(connected, PullOutcome::Applied { timestamp: 100 });
        assert_eq!(pending.await.unwrap().unwrap(), PushOutcome::Superseded);
        assert_eq!(f.hub.document("team2").unwrap()["users"][0]["name"], "TeamTwo");
        assert!(f.hub.document("team1").is_none());
        assert_eq!(f.engine.last_sync_timestamp(), Some(100));
        assert_eq!(f.target.snapshot().users[0].name, "TeamTwo");
        assert_eq!(
            f.engine.status().message.as_deref(),
            Some("Synced from hub team2")
        );
    }

    #[tokio::test]
    async fn test_reserved_push_dropped_after_hub_change() {
        let f = fixture(Some("team1"), None);

        let ticket = f.engine.reserve_push();
        f.engine.set_cloud_id(Some("team2".to_string()));
        let outcome = f
            .engine
            .schedule_reserved_push(snapshot("Old", 1.0), ticket)
            .unwrap()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome, PushOutcome::Superseded);
        assert_eq!(f.hub.request_count(), 0);
        assert!(f.engine.last_sync_timestamp().is_none());
    }

    #[tokio::test]
    async fn test_older_reservation_is_superseded_by_newer() {
        let f = fixture(Some("team1"), None);

        let older = f.engine.reserve_push();
        let newer = f.engine.reserve_push();
        let late = f
            .engine
            .schedule_reserved_push(snapshot("New", 2.0), newer)
            .unwrap();
        let early = f
            .engine
            .schedule_reserved_push(snapshot("Old", 1.0), older)
            .unwrap();

        assert!(matches!(
            late.await.unwrap().unwrap(),
            PushOutcome::Pushed { .. }
        ));
        assert_eq!(early.await.unwrap().unwrap(), PushOutcome::Superseded);
        assert_eq!(f.hub.document("team1").unwrap()["users"][0]["name"], "New");
    }

    #[tokio::test]
    async fn test_disconnect_stops_sync() {
        let f = fixture(Some("team1"), Some(100));

        f.engine.disconnect();

        assert!(f.engine.cloud_id().is_none());
        assert!(f.engine.last_sync_timestamp().is_none());
        assert_eq!(f.engine.pull(None).await, Err(SyncError::NotConfigured));
        assert_eq!(f.hub.request_count(), 0);
        assert_eq!(f.target.last_record().unwrap(), SyncRecord::default());
    }

    #[tokio::test]
    async fn test_two_clients_converge_through_hub() {
        // A has recorded ts=50; B pushes at ts=100
        let hub = Arc::new(MemoryHub::new());
        let a_target = Arc::new(TestTarget::default());
        let b_target = Arc::new(TestTarget::default());
        let settings = Settings {
            cloud_id: Some("team1".to_string()),
            ..Settings::default()
        };
        let a = SyncEngine::with_clock(
            hub.clone(),
            a_target.clone(),
            &Settings {
                last_sync_timestamp: Some(50),
                ..settings.clone()
            },
            SyncOptions::default(),
            Arc::new(ManualClock::new(0)),
        );
        let b = SyncEngine::with_clock(
            hub.clone(),
            b_target,
            &settings,
            SyncOptions::default(),
            Arc::new(ManualClock::new(100)),
        );

        b.push(snapshot("From B", 4.0), None).await.unwrap();
        assert_eq!(
            a.pull(None).await.unwrap(),
            PullOutcome::Applied { timestamp: 100 }
        );
        assert_eq!(a_target.snapshot().kwh_price, 4.0);

        hub.insert("team1", remote_doc("Late", 90));
        assert!(matches!(
            a.pull(None).await.unwrap(),
            PullOutcome::Stale { .. }
        ));
        assert_eq!(a_target.snapshot().users[0].name, "From B");
        assert_eq!(a.last_sync_timestamp(), Some(100));
    }
}
