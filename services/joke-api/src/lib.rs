use axum::{routing::get, Router};
use shared::JokeRepository;
use tower::ServiceBuilder;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;

#[derive(Clone)]
pub struct AppState {
    pub repo: JokeRepository,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Joke CRUD
        .route(
            "/joke",
            get(handlers::jokes::list_jokes).post(handlers::jokes::add_joke),
        )
        .route(
            "/joke/:id",
            get(handlers::jokes::get_joke)
                .put(handlers::jokes::update_joke)
                .delete(handlers::jokes::delete_joke),
        )
        .layer(
            ServiceBuilder::new()
                .layer(middleware::trace_layer())
                .layer(middleware::cors_layer()),
        )
        .with_state(state)
}
