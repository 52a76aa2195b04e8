use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared::repositories::RepoError;
use shared::store::StoreError;
use tracing::warn;

/// Boundary error: an HTTP status plus the short message placed in the
/// `{"message": ...}` response body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        // The underlying store error is logged here and goes no further;
        // callers only ever see the classification code.
        warn!(code = err.code(), error = %err.store_error(), "repository error");

        let status = match err {
            RepoError::NotFound(_) => StatusCode::NOT_FOUND,
            RepoError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.code().to_string(),
        }
    }
}

/// Delete failures arrive unclassified and keep their error text, matching
/// the delete response contract.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        warn!(error = %err, "store error");
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
