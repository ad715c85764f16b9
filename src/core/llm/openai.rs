//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{CompletionOutcome, CompletionRequest, TextGenerator};
use crate::errors::pipeline_error::{PipelineError, PipelineResult};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("voxnote-gateway/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: String) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                PipelineError::Summarization(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<CompletionOutcome> {
        debug!(model = %request.model, "calling chat completion API");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::Summarization(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Summarization(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::Summarization(format!("{status}: {body}")));
        }

        let raw: Value = serde_json::from_str(&body).map_err(|e| {
            PipelineError::Summarization(format!("malformed completion response: {e}"))
        })?;
        let parsed: CompletionResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            PipelineError::Summarization(format!("malformed completion response: {e}"))
        })?;

        let text = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                PipelineError::Summarization("no completion choices returned".to_string())
            })?;

        info!(chars = text.len(), "completion succeeded");
        Ok(CompletionOutcome { text, raw })
    }
}
