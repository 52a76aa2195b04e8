use std::sync::Arc;

use joke_api::{create_app, AppState};
use shared::{JokeRepository, MemoryStore};

/// Router wired to a fresh in-process store. The store handle is returned so
/// tests can inspect interaction counts or inject failures.
pub fn setup_test_app() -> (Arc<MemoryStore>, axum::Router) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        repo: JokeRepository::new(store.clone()),
    };

    (store, create_app(state))
}

pub mod fixtures {
    use serde_json::{json, Value};

    pub fn why_joke() -> Value {
        json!({
            "joke": "why",
            "punchline": "because"
        })
    }
}
