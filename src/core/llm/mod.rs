//! Text-generation service clients.

mod openai;

pub use openai::OpenAiGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::pipeline_error::PipelineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion request with the fixed generation parameters used by the
/// summarization stage: bounded output, moderate temperature favoring
/// consistency, a stop sequence and a single completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stop: String,
    pub temperature: f64,
    pub frequency_penalty: f64,
    pub max_tokens: u32,
    pub n: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stop: "}".to_string(),
            temperature: 0.5,
            frequency_penalty: 1.0,
            max_tokens: 4096,
            n: 1,
        }
    }
}

/// A completion plus the raw service response for persistence.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// Content of the first choice.
    pub text: String,
    /// Raw response body as returned by the service.
    pub raw: Value,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<CompletionOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_fixed_parameters() {
        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")]);
        assert_eq!(request.stop, "}");
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.frequency_penalty, 1.0);
        assert_eq!(request.max_tokens, 4096);
        assert_eq!(request.n, 1);
    }

    #[test]
    fn test_completion_request_serializes_all_parameters() {
        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["stop"], "}");
        assert_eq!(value["n"], 1);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
