//! In-memory hub, for tests and offline experiments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{HubClient, HubError};

/// A hub that keeps documents in a map.
///
/// Can be switched offline to simulate transport failures, and can add a
/// fixed latency to every request.
#[derive(Debug, Default)]
pub struct MemoryHub {
    docs: Mutex<HashMap<String, Value>>,
    offline: AtomicBool,
    latency: Mutex<Duration>,
    requests: AtomicUsize,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// When offline, every request fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Number of requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.docs().get(id).cloned()
    }

    pub fn insert(&self, id: impl Into<String>, document: Value) {
        self.docs().insert(id.into(), document);
    }

    fn docs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn begin_request(&self) -> Result<(), HubError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(HubError::Transport("hub is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HubClient for MemoryHub {
    async fn create_document(&self, payload: &Value) -> Result<String, HubError> {
        self.begin_request().await?;

        let id = Uuid::new_v4().simple().to_string();
        self.docs().insert(id.clone(), payload.clone());
        Ok(id)
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<Value>, HubError> {
        self.begin_request().await?;
        Ok(self.docs().get(id).cloned())
    }

    async fn put_document(&self, id: &str, payload: &Value) -> Result<(), HubError> {
        self.begin_request().await?;
        self.docs().insert(id.to_string(), payload.clone());
        Ok(())
    }
}
