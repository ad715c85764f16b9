use axum::{Router, extract::DefaultBodyLimit, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::transcribe;
use crate::state::AppState;
use std::sync::Arc;

/// Inline payloads are base64 inside JSON; allow headroom over the raw clip
/// size limit.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Create the API router with protected routes
///
/// Note: Authentication middleware should be applied in main.rs after state
/// is available
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trim-and-transcribe", post(transcribe::trim_and_transcribe))
        .route(
            "/trim-and-transcribe/upload",
            post(transcribe::trim_and_transcribe_upload),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
