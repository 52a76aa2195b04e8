use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::models::{DeleteReceipt, JokeInput, JokeRecord};
use crate::store::{DocumentStore, StoreError, StoredDocument};

const COLLECTION: &str = "jokes";

/// Classified repository failure. `Display` is the caller-facing code; the
/// wrapped store error is retained for server-side logging only and must
/// never reach a response body.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not_found")]
    NotFound(#[source] StoreError),
    #[error("bad_request")]
    BadRequest(#[source] StoreError),
}

impl RepoError {
    pub fn code(&self) -> &'static str {
        match self {
            RepoError::NotFound(_) => "not_found",
            RepoError::BadRequest(_) => "bad_request",
        }
    }

    pub fn store_error(&self) -> &StoreError {
        match self {
            RepoError::NotFound(e) | RepoError::BadRequest(e) => e,
        }
    }

    fn classify(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RepoError::NotFound(err),
            _ => RepoError::BadRequest(err),
        }
    }
}

/// CRUD over the jokes collection. Stateless apart from the shared store
/// handle, so one instance serves every request.
#[derive(Clone)]
pub struct JokeRepository {
    store: Arc<dyn DocumentStore>,
}

impl JokeRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<JokeRecord>, RepoError> {
        let documents = self
            .store
            .list_all(COLLECTION)
            .await
            .map_err(RepoError::BadRequest)?;

        Ok(documents.into_iter().map(JokeRecord::from_document).collect())
    }

    pub async fn get(&self, id: &str) -> Result<JokeRecord, RepoError> {
        let doc = self
            .store
            .get(COLLECTION, id)
            .await
            .map_err(RepoError::classify)?;

        Ok(JokeRecord::from_document(doc))
    }

    pub async fn add(&self, input: JokeInput) -> Result<JokeRecord, RepoError> {
        let doc = self
            .store
            .add(COLLECTION, input.field_patch())
            .await
            .map_err(RepoError::BadRequest)?;
        debug!(id = %doc.id, "added joke");

        Ok(JokeRecord {
            input,
            id: doc.id,
            created_at: doc.create_time,
            updated_at: doc.update_time,
        })
    }

    /// Two-step update: fetch to confirm existence and capture the original
    /// create time, then merge-write the fields present in the input.
    pub async fn update(&self, id: &str, input: JokeInput) -> Result<JokeRecord, RepoError> {
        let snapshot = self
            .store
            .get(COLLECTION, id)
            .await
            .map_err(RepoError::classify)?;

        let write = self
            .store
            .merge(COLLECTION, &snapshot.id, input.field_patch())
            .await
            .map_err(RepoError::BadRequest)?;

        let mut fields = snapshot.fields;
        for (name, value) in input.field_patch() {
            fields.insert(name, value);
        }

        Ok(JokeRecord::from_document(StoredDocument {
            id: snapshot.id,
            fields,
            create_time: snapshot.create_time,
            update_time: write.update_time,
        }))
    }

    /// Idempotent: deleting an id that does not exist still confirms.
    /// Failures here are the raw store error, unlike the other operations.
    pub async fn delete(&self, id: &str) -> Result<DeleteReceipt, StoreError> {
        self.store.delete(COLLECTION, id).await?;

        Ok(DeleteReceipt { id: id.to_string() })
    }
}
