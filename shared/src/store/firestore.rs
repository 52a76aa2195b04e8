use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::auth::{ServiceAccountKey, TokenProvider};
use super::{DocumentStore, FieldPatch, StoreError, StoredDocument, WriteResult};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const LIST_PAGE_SIZE: u32 = 300;

/// Firestore REST backend. One instance is built at startup and shared for
/// the process lifetime.
pub struct FirestoreStore {
    client: Client,
    tokens: TokenProvider,
    documents_url: String,
}

impl FirestoreStore {
    pub fn new(key: ServiceAccountKey) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_BASE_URL, key.project_id
        );
        let tokens = TokenProvider::new(&key, client.clone())?;

        Ok(Self {
            client,
            tokens,
            documents_url,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token).send().await?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListResponse = self.send(request).await?.json().await?;
            documents.extend(
                page.documents
                    .unwrap_or_default()
                    .into_iter()
                    .map(StoredDocument::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "listed collection");
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<StoredDocument, StoreError> {
        let request = self.client.get(self.document_url(collection, id));
        let doc: FirestoreDocument = self.send(request).await?.json().await?;
        doc.try_into()
    }

    async fn add(&self, collection: &str, patch: FieldPatch) -> Result<StoredDocument, StoreError> {
        let request = self
            .client
            .post(self.collection_url(collection))
            .json(&json!({ "fields": encode_fields(&patch)? }));
        let doc: FirestoreDocument = self.send(request).await?.json().await?;
        doc.try_into()
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: FieldPatch,
    ) -> Result<WriteResult, StoreError> {
        // A PATCH without an update mask replaces the whole document, so an
        // empty patch must not reach the wire.
        if patch.is_empty() {
            let doc = self.get(collection, id).await?;
            return Ok(WriteResult {
                update_time: doc.update_time,
            });
        }

        let mask: Vec<(&str, &str)> = patch
            .iter()
            .map(|(name, _)| ("updateMask.fieldPaths", name.as_str()))
            .collect();

        let request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&mask)
            .json(&json!({ "fields": encode_fields(&patch)? }));
        let doc: FirestoreDocument = self.send(request).await?.json().await?;
        let doc: StoredDocument = doc.try_into()?;

        Ok(WriteResult {
            update_time: doc.update_time,
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        // Firestore deletes are idempotent: deleting an absent document
        // succeeds with an empty body.
        let request = self.client.delete(self.document_url(collection, id));
        self.send(request).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(rename = "createTime")]
    create_time: DateTime<Utc>,
    #[serde(rename = "updateTime")]
    update_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    documents: Option<Vec<FirestoreDocument>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl TryFrom<FirestoreDocument> for StoredDocument {
    type Error = StoreError;

    fn try_from(doc: FirestoreDocument) -> Result<Self, StoreError> {
        let id = doc
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("document name {:?} has no id", doc.name)))?
            .to_string();

        let mut fields = Map::new();
        for (name, value) in doc.fields {
            // Non-scalar fields are outside this service's schema; skip them
            // rather than failing the whole document.
            if let Some(scalar) = decode_value(&value) {
                fields.insert(name, scalar);
            }
        }

        Ok(StoredDocument {
            id,
            fields,
            create_time: doc.create_time,
            update_time: doc.update_time,
        })
    }
}

async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound;
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or(body);

    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

fn encode_fields(patch: &FieldPatch) -> Result<Map<String, Value>, StoreError> {
    let mut fields = Map::new();
    for (name, value) in patch {
        fields.insert(name.clone(), encode_value(value)?);
    }
    Ok(fields)
}

fn encode_value(value: &Value) -> Result<Value, StoreError> {
    match value {
        Value::String(s) => Ok(json!({ "stringValue": s })),
        Value::Bool(b) => Ok(json!({ "booleanValue": b })),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Ok(json!({ "integerValue": n.to_string() }))
        }
        Value::Number(n) => Ok(json!({ "doubleValue": n })),
        Value::Null => Ok(json!({ "nullValue": "NULL_VALUE" })),
        other => Err(StoreError::Decode(format!(
            "unsupported field value: {}",
            other
        ))),
    }
}

fn decode_value(value: &Value) -> Option<Value> {
    let typed = value.as_object()?;
    if let Some(s) = typed.get("stringValue") {
        return Some(s.clone());
    }
    if let Some(b) = typed.get("booleanValue") {
        return Some(b.clone());
    }
    if let Some(i) = typed.get("integerValue").and_then(Value::as_str) {
        return i.parse::<i64>().ok().map(Value::from);
    }
    if let Some(d) = typed.get("doubleValue") {
        return Some(d.clone());
    }
    if typed.contains_key("nullValue") {
        return Some(Value::Null);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_decodes_into_stored_document() {
        let raw = json!({
            "name": "projects/demo/databases/(default)/documents/jokes/abc123",
            "fields": {
                "joke": { "stringValue": "why" },
                "punchline": { "stringValue": "because" },
                "tags": { "arrayValue": { "values": [] } }
            },
            "createTime": "2024-05-01T12:00:00.123456Z",
            "updateTime": "2024-05-02T08:30:00Z"
        });

        let doc: FirestoreDocument = serde_json::from_value(raw).unwrap();
        let stored = StoredDocument::try_from(doc).unwrap();

        assert_eq!(stored.id, "abc123");
        assert_eq!(stored.fields["joke"], "why");
        assert_eq!(stored.fields["punchline"], "because");
        // Non-scalar field is skipped, not an error
        assert!(!stored.fields.contains_key("tags"));
        assert!(stored.update_time > stored.create_time);
    }

    #[test]
    fn empty_list_response_has_no_documents() {
        let page: ListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_none());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn scalar_values_round_trip() {
        let cases = vec![
            (json!("hello"), json!({ "stringValue": "hello" })),
            (json!(true), json!({ "booleanValue": true })),
            (json!(42), json!({ "integerValue": "42" })),
            (json!(2.5), json!({ "doubleValue": 2.5 })),
        ];

        for (scalar, typed) in cases {
            assert_eq!(encode_value(&scalar).unwrap(), typed);
            assert_eq!(decode_value(&typed).unwrap(), scalar);
        }
    }

    #[test]
    fn compound_values_are_rejected_on_encode() {
        let err = encode_value(&json!({ "nested": true })).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
        }))
        .unwrap();
        assert_eq!(
            body.error.unwrap().message.unwrap(),
            "Missing or insufficient permissions."
        );
    }
}
