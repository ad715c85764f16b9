//! Trim-and-transcribe endpoints.
//!
//! Two ingestion routes (inline JSON and streamed multipart) normalize into
//! the same [`ProcessingRequest`] and run the same pipeline. Callers always
//! receive exactly one envelope: the full success shape, or a single failure
//! object with optional diagnostic URLs.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::json;

use crate::auth::Auth;
use crate::core::debug_upload::{self, DEBUG_NOTE};
use crate::core::pipeline::{Pipeline, PipelineSuccess};
use crate::core::request::{ProcessingRequest, TrimAndTranscribeBody};
use crate::core::summary::PostSummary;
use crate::errors::pipeline_error::PipelineError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub success: bool,
    pub transcription: String,
    pub duration: f64,
    pub from_time: f64,
    pub to_time: f64,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostSummary>,
}

impl From<PipelineSuccess> for TranscribeResponse {
    fn from(success: PipelineSuccess) -> Self {
        Self {
            success: true,
            transcription: success.transcription,
            duration: success.duration,
            from_time: success.window.from_time,
            to_time: success.window.to_time,
            file_size: success.file_size,
            summary: success.summary,
            post: success.post,
        }
    }
}

/// Single structured failure envelope. Validation failures are the caller's
/// to fix and map to 400; everything else is a 500 with diagnostics when
/// available.
struct FailureEnvelope {
    error: PipelineError,
    debug_files: Vec<String>,
}

impl FailureEnvelope {
    fn bare(error: PipelineError) -> Self {
        Self {
            error,
            debug_files: Vec::new(),
        }
    }
}

impl IntoResponse for FailureEnvelope {
    fn into_response(self) -> Response {
        let status = if self.error.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = json!({
            "status": status.as_u16(),
            "message": self.error.to_string(),
        });
        if !self.debug_files.is_empty() {
            body["debugFiles"] = json!(self.debug_files);
            body["debugNote"] = json!(DEBUG_NOTE);
        }

        (status, Json(body)).into_response()
    }
}

/// `POST /trim-and-transcribe` - inline-encoded payload.
pub async fn trim_and_transcribe(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(body): Json<TrimAndTranscribeBody>,
) -> Response {
    let request = match ProcessingRequest::from_inline(body, state.config.max_clip_seconds) {
        Ok(request) => request,
        Err(error) => return FailureEnvelope::bare(error).into_response(),
    };
    run_pipeline(&state, &auth, request).await
}

/// `POST /trim-and-transcribe/upload` - streamed multipart payload.
pub async fn trim_and_transcribe_upload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    multipart: Multipart,
) -> Response {
    let request =
        match ProcessingRequest::from_multipart(multipart, state.config.max_clip_seconds).await {
            Ok(request) => request,
            Err(error) => return FailureEnvelope::bare(error).into_response(),
        };
    run_pipeline(&state, &auth, request).await
}

async fn run_pipeline(
    state: &Arc<AppState>,
    auth: &Auth,
    request: ProcessingRequest,
) -> Response {
    let pipeline = Pipeline::from_state(state);
    match pipeline.run(request, auth).await {
        Ok(success) => Json(TranscribeResponse::from(success)).into_response(),
        Err(failure) => {
            // Diagnostics are collected before responding because their URLs
            // belong in the envelope; the uploads themselves can never fail
            // the response.
            let debug_files = debug_upload::upload_failure_artifacts(
                &state.debug_uploads,
                auth.user_id(),
                failure.error.class_name(),
                failure.input,
                failure.output,
            )
            .await;
            FailureEnvelope {
                error: failure.error,
                debug_files,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::ClipWindow;

    #[test]
    fn test_success_envelope_omits_absent_summary_fields() {
        let response = TranscribeResponse::from(PipelineSuccess {
            transcription: "hello".to_string(),
            duration: 3.0,
            window: ClipWindow::new(2.0, 5.0, 300.0).unwrap(),
            file_size: 42,
            summary: None,
            post: None,
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["duration"], 3.0);
        assert_eq!(value["fromTime"], 2.0);
        assert_eq!(value["toTime"], 5.0);
        assert_eq!(value["fileSize"], 42);
        assert!(value.get("summary").is_none());
        assert!(value.get("post").is_none());
    }

    #[test]
    fn test_success_envelope_carries_summary_and_post() {
        let response = TranscribeResponse::from(PipelineSuccess {
            transcription: "hello".to_string(),
            duration: 3.0,
            window: ClipWindow::new(0.0, 3.0, 300.0).unwrap(),
            file_size: 42,
            summary: Some("cleaned".to_string()),
            post: Some(PostSummary {
                id: "p1".to_string(),
                title: "Random Title x".to_string(),
                summarized_content: "cleaned".to_string(),
                final_content: "cleaned".to_string(),
            }),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["summary"], "cleaned");
        assert_eq!(value["post"]["id"], "p1");
        assert_eq!(value["post"]["summarizedContent"], "cleaned");
    }
}
