use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{FieldPatch, StoredDocument};

/// Fields a caller may supply when creating or updating a joke. Both are
/// optional; a `None` field is never written or merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punchline: Option<String>,
}

impl JokeInput {
    /// Sparse (field, value) pairs for the fields actually present.
    pub fn field_patch(&self) -> FieldPatch {
        let mut patch = FieldPatch::new();
        if let Some(joke) = &self.joke {
            patch.push(("joke".to_string(), Value::String(joke.clone())));
        }
        if let Some(punchline) = &self.punchline {
            patch.push(("punchline".to_string(), Value::String(punchline.clone())));
        }
        patch
    }

    fn from_fields(fields: &serde_json::Map<String, Value>) -> Self {
        Self {
            joke: fields.get("joke").and_then(Value::as_str).map(String::from),
            punchline: fields
                .get("punchline")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }
}

/// A joke as returned to callers: the caller-supplied fields plus the
/// store-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JokeRecord {
    #[serde(flatten)]
    pub input: JokeInput,
    pub id: String,
    #[serde(rename = "dateCreated")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "dateUpdated")]
    pub updated_at: DateTime<Utc>,
}

impl JokeRecord {
    pub fn from_document(doc: StoredDocument) -> Self {
        Self {
            input: JokeInput::from_fields(&doc.fields),
            id: doc.id,
            created_at: doc.create_time,
            updated_at: doc.update_time,
        }
    }
}

/// Confirmation payload for a delete, echoing the requested id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub id: String,
}
