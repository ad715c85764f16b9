//! OpenAI-compatible transcription client (Whisper REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{SpeechToText, Transcript};
use crate::errors::pipeline_error::{PipelineError, PipelineResult};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("voxnote-gateway/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

pub struct OpenAiTranscriber {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: String, base_url: String, model: String) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                PipelineError::Transcription(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> PipelineResult<Transcript> {
        let audio_len = audio.len();
        let file_part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| PipelineError::Transcription(format!("invalid MIME type: {e}")))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        debug!(
            bytes = audio_len,
            model = %self.model,
            "sending audio to transcription API"
        );

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Transcription(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Transcription(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => format!(
                    "{} ({})",
                    parsed.error.message,
                    parsed.error.error_type.unwrap_or_else(|| status.to_string())
                ),
                Err(_) => format!("{status}: {body}"),
            };
            return Err(PipelineError::Transcription(message));
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::Transcription(format!("malformed transcription response: {e}"))
        })?;

        info!(
            chars = parsed.text.len(),
            "transcription completed"
        );

        Ok(Transcript {
            text: parsed.text.trim().to_string(),
            duration_seconds: parsed.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transcriber(base_url: String) -> OpenAiTranscriber {
        OpenAiTranscriber::new("test-key".to_string(), base_url, "whisper-1".to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_parses_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "  hello world  "})),
            )
            .mount(&server)
            .await;

        let result = transcriber(server.uri())
            .transcribe(b"mp3".to_vec(), "audio.mp3", "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(result.text, "hello world");
        assert!(result.duration_seconds.is_none());
    }

    #[tokio::test]
    async fn test_transcribe_wraps_service_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "quota exhausted", "type": "rate_limit_error"}
            })))
            .mount(&server)
            .await;

        let err = transcriber(server.uri())
            .transcribe(b"mp3".to_vec(), "audio.mp3", "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(_)));
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_transcribe_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not-json"))
            .mount(&server)
            .await;

        let err = transcriber(server.uri())
            .transcribe(b"mp3".to_vec(), "audio.mp3", "audio/mpeg")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
