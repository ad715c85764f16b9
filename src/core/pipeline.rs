//! The audio processing pipeline.
//!
//! Stages run strictly in order within one request task: write input
//! artifact, transcode, transcribe, then (optionally) summarize. The scratch
//! area wraps only the transcode and transcribe stages, so temp artifacts
//! are gone before summarization starts and on every failure path. Quota
//! bookkeeping and success-path debug uploads are fire-and-forget tasks that
//! never join the response path.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Auth;
use crate::core::debug_upload::{CAF_CONTENT_TYPE, DebugUploader, MP3_CONTENT_TYPE};
use crate::core::quota;
use crate::core::request::{ClipWindow, ProcessingRequest, SummarizationType};
use crate::core::scratch::{ArtifactKind, ScratchArea};
use crate::core::stt::SpeechToText;
use crate::core::summary::{PostSummary, Summarizer};
use crate::core::transcode::{self, Transcoder};
use crate::errors::pipeline_error::{PipelineError, PipelineResult};
use crate::state::AppState;
use crate::storage::DocumentStore;

/// Identity used for persisted posts when the requester is anonymous.
const DEFAULT_POST_USER: &str = "default-user";

#[derive(Debug, Clone)]
pub struct PipelineSuccess {
    pub transcription: String,
    pub duration: f64,
    pub window: ClipWindow,
    pub file_size: u64,
    pub summary: Option<String>,
    pub post: Option<PostSummary>,
}

/// A failed run plus whatever artifacts were captured before cleanup, so the
/// caller can attach diagnostics to the failure envelope.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: PipelineError,
    pub input: Option<Bytes>,
    pub output: Option<Bytes>,
}

pub struct Pipeline {
    scratch_dir: PathBuf,
    transcoder: Transcoder,
    ffprobe_path: PathBuf,
    transcriber: Arc<dyn SpeechToText>,
    summarizer: Summarizer,
    documents: Arc<dyn DocumentStore>,
    debug_uploads: Arc<DebugUploader>,
}

impl Pipeline {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            scratch_dir: state.config.scratch_dir.clone(),
            transcoder: Transcoder::new(
                state.config.ffmpeg_path.clone(),
                state.config.transcode_timeout,
            ),
            ffprobe_path: state.config.ffprobe_path.clone(),
            transcriber: state.transcriber.clone(),
            summarizer: Summarizer::new(
                state.generator.clone(),
                state.templates.clone(),
                state.documents.clone(),
                state.config.llm_model.clone(),
            ),
            documents: state.documents.clone(),
            debug_uploads: state.debug_uploads.clone(),
        }
    }

    pub async fn run(
        &self,
        request: ProcessingRequest,
        auth: &Auth,
    ) -> Result<PipelineSuccess, PipelineFailure> {
        // Keep the decoded input around for diagnostics on any failure path.
        let input = request.audio.clone();
        let mut captured_output = None;

        match self.execute(request, auth, &mut captured_output).await {
            Ok(success) => Ok(success),
            Err(error) => {
                error!("pipeline failed: {error}");
                Err(PipelineFailure {
                    error,
                    input: Some(input),
                    output: captured_output,
                })
            }
        }
    }

    async fn execute(
        &self,
        request: ProcessingRequest,
        auth: &Auth,
        captured_output: &mut Option<Bytes>,
    ) -> PipelineResult<PipelineSuccess> {
        let window = request.window;
        let request_id = short_request_id();
        info!(
            request_id = %request_id,
            from_time = window.from_time,
            to_time = window.to_time,
            bytes = request.audio.len(),
            "processing audio clip"
        );

        // Traceability upload of the raw input, accepted storage cost.
        self.spawn_debug_upload(
            request.audio.clone(),
            DebugUploader::input_debug_file_name(&request_id),
            auth.user_id().to_string(),
            CAF_CONTENT_TYPE,
        );

        let transcript;
        let output_len;
        {
            // Scratch scope: artifacts exist only while the transcoder and
            // the transcription client need them.
            let mut scratch = ScratchArea::new(&self.scratch_dir);
            let input_path = scratch.allocate(ArtifactKind::Input);
            let output_path = scratch.allocate(ArtifactKind::Output);

            tokio::fs::write(&input_path, &request.audio)
                .await
                .map_err(|e| {
                    PipelineError::Transcode(format!("failed to write input artifact: {e}"))
                })?;

            transcode::probe_format(&self.ffprobe_path, &input_path).await;

            self.transcoder
                .trim(&input_path, window, &output_path)
                .await?;
            let output = Bytes::from(transcode::read_output(&output_path).await?);
            output_len = output.len() as u64;
            *captured_output = Some(output.clone());

            self.spawn_debug_upload(
                output.clone(),
                DebugUploader::output_debug_file_name(&request_id),
                auth.user_id().to_string(),
                MP3_CONTENT_TYPE,
            );

            transcript = self
                .transcriber
                .transcribe(output.to_vec(), "audio.mp3", MP3_CONTENT_TYPE)
                .await?;
        }

        info!(
            request_id = %request_id,
            chars = transcript.text.len(),
            "transcription completed"
        );

        if let Some(uid) = auth.id.clone() {
            tokio::spawn(quota::decrement_remaining_minutes(
                self.documents.clone(),
                uid,
            ));
        }

        let mut summary = None;
        let mut post = None;
        if request.summarization != SummarizationType::None {
            let post_user = auth
                .id
                .clone()
                .unwrap_or_else(|| DEFAULT_POST_USER.to_string());
            match self
                .summarizer
                .summarize(&post_user, &transcript.text, request.summarization)
                .await
            {
                Ok(outcome) => {
                    summary = Some(outcome.summary);
                    post = Some(outcome.post);
                }
                Err(e) => {
                    warn!("summarization failed, responding with transcript only: {e}");
                }
            }
        }

        Ok(PipelineSuccess {
            transcription: transcript.text,
            duration: window.duration(),
            window,
            file_size: output_len,
            summary,
            post,
        })
    }

    fn spawn_debug_upload(
        &self,
        bytes: Bytes,
        file_name: String,
        user_id: String,
        content_type: &'static str,
    ) {
        if !self.debug_uploads.is_enabled() {
            return;
        }
        let uploader = self.debug_uploads.clone();
        tokio::spawn(async move {
            uploader
                .upload(bytes, &file_name, &user_id, content_type)
                .await;
        });
    }
}

fn short_request_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}
