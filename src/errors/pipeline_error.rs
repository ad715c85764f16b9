//! Error taxonomy for the audio processing pipeline.
//!
//! Fatal variants abort the pipeline and surface as a failure envelope;
//! `Validation` is the only caller-fixable class and maps to a 4xx response.
//! Summarization and template failures are caught at their own stage boundary
//! and degrade the response to transcript-only instead of propagating.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Bad time window or missing/invalid request field.
    #[error("{0}")]
    Validation(String),

    /// The external audio-processing binary is not reachable or executable.
    #[error("FFmpeg binary not found ({0})")]
    BinaryNotFound(String),

    /// The trim/re-encode subprocess failed, timed out, overflowed its
    /// output buffer, or produced an empty artifact.
    #[error("FFmpeg execution failed: {0}")]
    Transcode(String),

    /// The speech-to-text service rejected or failed the request. Always
    /// fatal; there is no fallback transcript.
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Neither the requested template nor the default template exists.
    #[error("Prompt template not found: {0}")]
    TemplateNotFound(String),

    /// The text-generation stage failed. Non-fatal to the request.
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// Document-store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Error-class name used in diagnostic artifact keys, mirroring the
    /// constructor-name convention of the upstream debug tooling.
    pub fn class_name(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::BinaryNotFound(_) => "BinaryNotFoundError",
            PipelineError::Transcode(_) => "TranscodeError",
            PipelineError::Transcription(_) => "TranscriptionError",
            PipelineError::TemplateNotFound(_) => "TemplateNotFoundError",
            PipelineError::Summarization(_) => "SummarizationError",
            PipelineError::Storage(_) => "StorageError",
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

impl From<crate::storage::StoreError> for PipelineError {
    fn from(err: crate::storage::StoreError) -> Self {
        PipelineError::Storage(err.to_string())
    }
}
