//! Authentication errors returned by the bearer-token middleware.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingAuthHeader,

    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    #[error("invalid credentials")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!("authentication failed: {}", self);
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": 401,
                "code": "unauthorized",
                "message": "You need to login first",
            })),
        )
            .into_response()
    }
}
