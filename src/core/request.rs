//! Ingestion normalizer.
//!
//! Two ingestion paths (inline-encoded JSON body and streamed multipart
//! upload) converge here into one [`ProcessingRequest`]: a single byte
//! buffer, a validated time window, and a summarization mode. Everything
//! downstream is path-agnostic.

use axum::extract::Multipart;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::pipeline_error::{PipelineError, PipelineResult};

/// Time window of the clip to keep, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub from_time: f64,
    pub to_time: f64,
}

impl ClipWindow {
    /// Validates `0 <= from < to` and `to - from <= max_clip_seconds`.
    pub fn new(from_time: f64, to_time: f64, max_clip_seconds: f64) -> PipelineResult<Self> {
        if !from_time.is_finite() || !to_time.is_finite() {
            return Err(PipelineError::Validation(
                "fromTime and toTime must be finite numbers".to_string(),
            ));
        }
        if from_time < 0.0 {
            return Err(PipelineError::Validation(
                "fromTime must not be negative".to_string(),
            ));
        }
        if to_time <= from_time {
            return Err(PipelineError::Validation(
                "toTime must be greater than fromTime".to_string(),
            ));
        }
        if to_time - from_time > max_clip_seconds {
            return Err(PipelineError::Validation(format!(
                "clip length must not exceed {max_clip_seconds} seconds"
            )));
        }
        Ok(Self { from_time, to_time })
    }

    pub fn duration(&self) -> f64 {
        self.to_time - self.from_time
    }
}

/// Requested post-processing of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizationType {
    None,
    Summarize,
    SimpleCleanup,
    WhatsappCleanup,
    Title,
}

impl SummarizationType {
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        match raw {
            "none" => Ok(Self::None),
            "summarize" => Ok(Self::Summarize),
            "simple-cleanup" => Ok(Self::SimpleCleanup),
            "whatsapp-cleanup" => Ok(Self::WhatsappCleanup),
            "title" => Ok(Self::Title),
            other => Err(PipelineError::Validation(format!(
                "summarizationType must be one of: none, summarize, simple-cleanup, \
                 whatsapp-cleanup, title (got '{other}')"
            ))),
        }
    }

    /// Template driving the summarization stage, `None` when skipped.
    /// General summarization maps onto the simple-cleanup template.
    pub fn template_id(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Summarize | Self::SimpleCleanup => Some("simple-cleanup"),
            Self::WhatsappCleanup => Some("whatsapp-cleanup"),
            Self::Title => Some("title"),
        }
    }

    /// Domain hint substituted into the template.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::WhatsappCleanup => "whatsapp.com",
            _ => "notion.so",
        }
    }
}

/// Inline request body for `POST /trim-and-transcribe`.
///
/// `fileBlob` is either a base64 string or a JSON array of byte values, for
/// clients that post raw buffers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimAndTranscribeBody {
    pub file_blob: Value,
    pub from_time: f64,
    pub to_time: f64,
    pub summarization_type: String,
}

/// A normalized request: the decoded audio plus its validated parameters.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub audio: Bytes,
    pub window: ClipWindow,
    pub summarization: SummarizationType,
}

impl ProcessingRequest {
    pub fn from_inline(
        body: TrimAndTranscribeBody,
        max_clip_seconds: f64,
    ) -> PipelineResult<Self> {
        let window = ClipWindow::new(body.from_time, body.to_time, max_clip_seconds)?;
        let summarization = SummarizationType::parse(&body.summarization_type)?;
        let audio = decode_file_blob(&body.file_blob)?;
        if audio.is_empty() {
            return Err(PipelineError::Validation(
                "fileBlob must not be empty".to_string(),
            ));
        }
        Ok(Self {
            audio,
            window,
            summarization,
        })
    }

    /// Drains a multipart stream with parts `file`, `fromTime`, `toTime` and
    /// `summarizationType`. The file part and the summarization type are
    /// required and must be non-empty.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_clip_seconds: f64,
    ) -> PipelineResult<Self> {
        let mut audio: Option<Bytes> = None;
        let mut from_time: Option<f64> = None;
        let mut to_time: Option<f64> = None;
        let mut summarization_type: Option<String> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| PipelineError::Validation(format!("malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let bytes = field.bytes().await.map_err(|e| {
                        PipelineError::Validation(format!("failed to read file part: {e}"))
                    })?;
                    audio = Some(bytes);
                }
                "fromTime" => from_time = Some(text_field_as_f64(field, "fromTime").await?),
                "toTime" => to_time = Some(text_field_as_f64(field, "toTime").await?),
                "summarizationType" => {
                    let text = field.text().await.map_err(|e| {
                        PipelineError::Validation(format!(
                            "failed to read summarizationType part: {e}"
                        ))
                    })?;
                    summarization_type = Some(text);
                }
                // Unknown parts are drained and ignored.
                _ => {}
            }
        }

        let audio = audio
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| PipelineError::Validation("file part is required".to_string()))?;
        let from_time = from_time
            .ok_or_else(|| PipelineError::Validation("fromTime part is required".to_string()))?;
        let to_time = to_time
            .ok_or_else(|| PipelineError::Validation("toTime part is required".to_string()))?;
        let summarization_type = summarization_type
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Validation("summarizationType part is required".to_string())
            })?;

        let window = ClipWindow::new(from_time, to_time, max_clip_seconds)?;
        let summarization = SummarizationType::parse(summarization_type.trim())?;
        Ok(Self {
            audio,
            window,
            summarization,
        })
    }
}

async fn text_field_as_f64(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> PipelineResult<f64> {
    let text = field
        .text()
        .await
        .map_err(|e| PipelineError::Validation(format!("failed to read {name} part: {e}")))?;
    text.trim()
        .parse()
        .map_err(|_| PipelineError::Validation(format!("{name} must be a number")))
}

/// Decode the inline payload: base64 when textual, raw bytes when the
/// transport already supplies a byte array.
fn decode_file_blob(blob: &Value) -> PipelineResult<Bytes> {
    match blob {
        Value::String(encoded) => BASE64
            .decode(encoded.trim())
            .map(Bytes::from)
            .map_err(|e| PipelineError::Validation(format!("fileBlob is not valid base64: {e}"))),
        Value::Array(values) => {
            let mut bytes = Vec::with_capacity(values.len());
            for value in values {
                let byte = value
                    .as_u64()
                    .filter(|b| *b <= u8::MAX as u64)
                    .ok_or_else(|| {
                        PipelineError::Validation(
                            "fileBlob array must contain byte values (0-255)".to_string(),
                        )
                    })?;
                bytes.push(byte as u8);
            }
            Ok(Bytes::from(bytes))
        }
        _ => Err(PipelineError::Validation(
            "fileBlob must be a base64 string or an array of bytes".to_string(),
        )),
    }
}
