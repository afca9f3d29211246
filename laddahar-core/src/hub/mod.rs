//! Remote hub clients.
//!
//! A hub is an opaque key-value blob service holding one shared JSON
//! document per id. Clients translate create/fetch/put into the provider's
//! calls and normalize responses into found, not-found and error. They never
//! look inside the document.

mod discovery;
mod error;
mod jsonblob;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use discovery::{discover_document_id, ID_HEADER};
pub use error::HubError;
pub use jsonblob::{JsonBlobClient, DEFAULT_HUB_URL};
pub use memory::MemoryHub;

#[async_trait]
pub trait HubClient: Send + Sync {
    /// Allocates a new document holding `payload` and returns its id.
    async fn create_document(&self, payload: &Value) -> Result<String, HubError>;

    /// Fetches a document. Returns `Ok(None)` if the hub has no document
    /// with this id.
    async fn fetch_document(&self, id: &str) -> Result<Option<Value>, HubError>;

    /// Overwrites the document with the given id.
    async fn put_document(&self, id: &str, payload: &Value) -> Result<(), HubError>;
}
