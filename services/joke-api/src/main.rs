use std::sync::Arc;

use joke_api::config::Config;
use joke_api::{create_app, AppState};
use shared::store::auth::ServiceAccountKey;
use shared::{FirestoreStore, JokeRepository};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    // The store client is built once and shared for the process lifetime.
    // A missing or invalid credential aborts startup before the port binds.
    let key = ServiceAccountKey::from_file(&config.service_account_path)?;
    info!(project = %key.project_id, "Connecting to Firestore");
    let store = FirestoreStore::new(key)?;

    let state = AppState {
        repo: JokeRepository::new(Arc::new(store)),
    };
    let app = create_app(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("joke-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
