use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use shared::models::{DeleteReceipt, JokeInput, JokeRecord};

use crate::error::ApiError;
use crate::AppState;

pub async fn list_jokes(
    State(state): State<AppState>,
) -> Result<Json<Vec<JokeRecord>>, ApiError> {
    let jokes = state.repo.list().await?;
    Ok(Json(jokes))
}

pub async fn get_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JokeRecord>, ApiError> {
    let joke = state.repo.get(&id).await?;
    Ok(Json(joke))
}

pub async fn add_joke(
    State(state): State<AppState>,
    body: Result<Json<JokeInput>, JsonRejection>,
) -> Result<Json<JokeRecord>, ApiError> {
    // A body that fails to parse never reaches the store
    let Json(input) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let added = state.repo.add(input).await?;
    Ok(Json(added))
}

pub async fn update_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<JokeInput>, JsonRejection>,
) -> Result<Json<JokeRecord>, ApiError> {
    let Json(input) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let updated = state.repo.update(&id, input).await?;
    Ok(Json(updated))
}

pub async fn delete_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteReceipt>, ApiError> {
    let receipt = state.repo.delete(&id).await?;
    Ok(Json(receipt))
}
