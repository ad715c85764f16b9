pub mod debug_upload;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod quota;
pub mod request;
pub mod scratch;
pub mod stt;
pub mod summary;
pub mod transcode;

// Re-export public types for convenience
pub use debug_upload::DebugUploader;
pub use pipeline::{Pipeline, PipelineFailure, PipelineSuccess};
pub use request::{ClipWindow, ProcessingRequest, SummarizationType, TrimAndTranscribeBody};
pub use scratch::{ArtifactKind, ScratchArea};
pub use transcode::Transcoder;
