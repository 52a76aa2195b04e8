pub mod auth;
pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("auth error: {0}")]
    Auth(String),
    #[error("malformed document: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Fields present in a write, in declaration order. A merge touches only the
/// fields listed here.
pub type FieldPatch = Vec<(String, Value)>;

/// One document as held by the store, with its server-assigned metadata.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub fields: serde_json::Map<String, Value>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Server-assigned timestamp attached to a completed write.
#[derive(Debug, Clone, Copy)]
pub struct WriteResult {
    pub update_time: DateTime<Utc>,
}

/// A managed document database addressed by collection name and document id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Enumerate every document in the collection, in store order. An empty
    /// collection yields an empty vec.
    async fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Fetch one document. A missing id is `StoreError::NotFound`.
    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument, StoreError>;

    /// Create a document with a store-minted id. The returned document's
    /// create and update times coincide.
    async fn add(&self, collection: &str, patch: FieldPatch) -> Result<StoredDocument, StoreError>;

    /// Write only the fields in `patch`, leaving all others untouched.
    /// Creates the document when absent.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: FieldPatch,
    ) -> Result<WriteResult, StoreError>;

    /// Delete the document if present. Deleting an absent id succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
