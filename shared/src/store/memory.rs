use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{DocumentStore, FieldPatch, StoreError, StoredDocument, WriteResult};

// 2024-01-01T00:00:00Z; the logical clock counts seconds from here.
const CLOCK_EPOCH: i64 = 1_704_067_200;

#[derive(Debug, Clone)]
struct MemoryDoc {
    fields: Map<String, Value>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

/// In-process `DocumentStore` used by the test suites. Write timestamps come
/// from a logical clock, so consecutive writes are strictly ordered, and
/// every trait call is counted so tests can assert on store interactions.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, HashMap<String, MemoryDoc>>>,
    clock: AtomicI64,
    ops: AtomicU64,
    fail_with: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed so far.
    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::SeqCst)
    }

    /// Force every subsequent operation to fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    fn tick(&self) -> DateTime<Utc> {
        let offset = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp(CLOCK_EPOCH + offset, 0).expect("logical clock in range")
    }

    fn record_op(&self) -> Result<(), StoreError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(StoreError::Api {
                status: 503,
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        self.record_op()?;

        let collections = self.collections.lock().unwrap();
        let mut documents: Vec<StoredDocument> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| StoredDocument {
                        id: id.clone(),
                        fields: doc.fields.clone(),
                        create_time: doc.create_time,
                        update_time: doc.update_time,
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Arrival order
        documents.sort_by_key(|doc| doc.create_time);
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument, StoreError> {
        self.record_op()?;

        let collections = self.collections.lock().unwrap();
        let doc = collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .ok_or(StoreError::NotFound)?;

        Ok(StoredDocument {
            id: id.to_string(),
            fields: doc.fields.clone(),
            create_time: doc.create_time,
            update_time: doc.update_time,
        })
    }

    async fn add(&self, collection: &str, patch: FieldPatch) -> Result<StoredDocument, StoreError> {
        self.record_op()?;

        let id = Uuid::new_v4().simple().to_string();
        let now = self.tick();
        let fields: Map<String, Value> = patch.into_iter().collect();

        let mut collections = self.collections.lock().unwrap();
        collections.entry(collection.to_string()).or_default().insert(
            id.clone(),
            MemoryDoc {
                fields: fields.clone(),
                create_time: now,
                update_time: now,
            },
        );

        Ok(StoredDocument {
            id,
            fields,
            create_time: now,
            update_time: now,
        })
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: FieldPatch,
    ) -> Result<WriteResult, StoreError> {
        self.record_op()?;

        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();

        // An empty patch writes nothing; report the current update time,
        // like the REST backend.
        if patch.is_empty() {
            let doc = docs.get(id).ok_or(StoreError::NotFound)?;
            return Ok(WriteResult {
                update_time: doc.update_time,
            });
        }

        let now = self.tick();
        match docs.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                for (name, value) in patch {
                    doc.fields.insert(name, value);
                }
                doc.update_time = now;
            }
            // Set-with-merge creates the document when absent
            Entry::Vacant(entry) => {
                entry.insert(MemoryDoc {
                    fields: patch.into_iter().collect(),
                    create_time: now,
                    update_time: now,
                });
            }
        }

        Ok(WriteResult { update_time: now })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.record_op()?;

        let mut collections = self.collections.lock().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_then_get_returns_same_document() {
        let store = MemoryStore::new();
        let created = store
            .add("jokes", vec![("joke".to_string(), json!("why"))])
            .await
            .unwrap();
        assert_eq!(created.create_time, created.update_time);

        let fetched = store.get("jokes", &created.id).await.unwrap();
        assert_eq!(fetched.fields["joke"], "why");
        assert_eq!(fetched.create_time, created.create_time);
    }

    #[tokio::test]
    async fn merge_touches_only_patched_fields_and_advances_update_time() {
        let store = MemoryStore::new();
        let created = store
            .add(
                "jokes",
                vec![
                    ("joke".to_string(), json!("why")),
                    ("punchline".to_string(), json!("because")),
                ],
            )
            .await
            .unwrap();

        let result = store
            .merge(
                "jokes",
                &created.id,
                vec![("punchline".to_string(), json!("because!"))],
            )
            .await
            .unwrap();
        assert!(result.update_time > created.update_time);

        let fetched = store.get("jokes", &created.id).await.unwrap();
        assert_eq!(fetched.fields["joke"], "why");
        assert_eq!(fetched.fields["punchline"], "because!");
        assert_eq!(fetched.create_time, created.create_time);
        assert_eq!(fetched.update_time, result.update_time);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete("jokes", "no-such-id").await.unwrap();

        let created = store.add("jokes", Vec::new()).await.unwrap();
        store.delete("jokes", &created.id).await.unwrap();
        store.delete("jokes", &created.id).await.unwrap();

        assert!(matches!(
            store.get("jokes", &created.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_is_empty_for_unknown_collection_and_ordered_by_arrival() {
        let store = MemoryStore::new();
        assert!(store.list_all("jokes").await.unwrap().is_empty());

        let first = store.add("jokes", Vec::new()).await.unwrap();
        let second = store.add("jokes", Vec::new()).await.unwrap();

        let ids: Vec<String> = store
            .list_all("jokes")
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn injected_failure_surfaces_and_ops_are_counted() {
        let store = MemoryStore::new();
        store.add("jokes", Vec::new()).await.unwrap();
        assert_eq!(store.ops(), 1);

        store.fail_with("store offline");
        let err = store.list_all("jokes").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        assert_eq!(store.ops(), 2);
    }
}
