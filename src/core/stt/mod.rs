//! Speech-to-text service clients.

mod openai;

pub use openai::OpenAiTranscriber;

use async_trait::async_trait;

use crate::errors::pipeline_error::PipelineResult;

/// Transcript returned by a speech-to-text service.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Audio duration as reported by the service, when it reports one.
    pub duration_seconds: Option<f64>,
}

/// A batch speech-to-text service. This is the one stage whose failure is
/// always fatal to a request; implementations wrap every service-level
/// failure into [`crate::PipelineError::Transcription`].
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> PipelineResult<Transcript>;
}
