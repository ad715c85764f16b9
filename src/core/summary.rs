//! Summarization stage: resolve a template, render it against the
//! transcript, call the text-generation service, and persist the artifacts.
//!
//! This whole stage is "nice to have" enrichment. Its failures are caught at
//! the pipeline boundary and the request degrades to transcript-only; a
//! persistence failure here never invalidates an already-produced
//! transcript.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::core::llm::{ChatMessage, CompletionRequest, TextGenerator};
use crate::core::prompts::{self, TemplateResolver};
use crate::core::request::SummarizationType;
use crate::errors::pipeline_error::{PipelineError, PipelineResult};
use crate::storage::{DocumentStore, collections};
use crate::utils::{now_rfc2822, now_rfc3339};

/// System-side preamble sent before the rendered prompt.
pub const ASSISTANT_PREAMBLE: &str =
    "You are a note taking assistant which helps users to take note";

/// Post fields echoed back in the success envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub summarized_content: String,
    pub final_content: String,
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    pub post: PostSummary,
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<TemplateResolver>,
    documents: Arc<dyn DocumentStore>,
    model: String,
}

impl Summarizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        templates: Arc<TemplateResolver>,
        documents: Arc<dyn DocumentStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            templates,
            documents,
            model: model.into(),
        }
    }

    pub async fn summarize(
        &self,
        user_id: &str,
        transcript: &str,
        kind: SummarizationType,
    ) -> PipelineResult<SummaryOutcome> {
        let Some(template_id) = kind.template_id() else {
            return Err(PipelineError::Summarization(
                "summarization disabled for this request".to_string(),
            ));
        };

        let template = self.templates.resolve(template_id).await?;
        let prompt = prompts::render(&template.template, transcript, Some(kind.domain()));
        debug!(template_id, chars = prompt.len(), "rendered summarization prompt");

        let request = CompletionRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::assistant(ASSISTANT_PREAMBLE),
                ChatMessage::user(prompt),
            ],
        );
        let outcome = self.generator.complete(&request).await?;

        let now = now_rfc3339();
        let request_json = serde_json::to_string(&request)
            .map_err(|e| PipelineError::Summarization(format!("failed to encode request: {e}")))?;

        // One record per generation call: rendered input, raw output and the
        // cleaned text, for post-hoc auditing of what the model was shown.
        self.documents
            .insert_one(
                collections::PROMPTS,
                json!({
                    "userId": user_id,
                    "input": request_json,
                    "output": outcome.raw.to_string(),
                    "template": template.template,
                    "textSource": transcript,
                    "cleanResponse": outcome.text,
                    "createdAt": now,
                    "lastUpdated": now,
                }),
            )
            .await?;

        let title = format!("Random Title {}", now_rfc2822());
        let post_id = self
            .documents
            .insert_one(
                collections::POSTS,
                json!({
                    "title": title,
                    "userId": user_id,
                    "audioUrl": null,
                    "transcriptionResult": transcript,
                    "summarizedContent": outcome.text,
                    "finalContent": outcome.text,
                    "public": false,
                    "transcriptionId": null,
                    "tags": [],
                    "createdAt": now,
                    "lastUpdated": now,
                    "isDeleted": false,
                }),
            )
            .await?;

        info!(post_id = %post_id, "post created from summarized transcript");

        Ok(SummaryOutcome {
            summary: outcome.text.clone(),
            post: PostSummary {
                id: post_id,
                title,
                summarized_content: outcome.text.clone(),
                final_content: outcome.text,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::CompletionOutcome;
    use crate::storage::MemoryDocumentStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Generator stub that records the request it was handed.
    struct RecordingGenerator {
        seen: Mutex<Option<CompletionRequest>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn ok() -> Self {
            Self {
                seen: Mutex::new(None),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                seen: Mutex::new(None),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> PipelineResult<CompletionOutcome> {
            *self.seen.lock() = Some(request.clone());
            if self.fail {
                return Err(PipelineError::Summarization("service down".to_string()));
            }
            Ok(CompletionOutcome {
                text: "Cleaned note".to_string(),
                raw: json!({"choices": [{"message": {"content": "Cleaned note"}}]}),
            })
        }
    }

    fn summarizer(
        generator: Arc<RecordingGenerator>,
    ) -> (Arc<MemoryDocumentStore>, Summarizer) {
        let store = Arc::new(MemoryDocumentStore::new());
        let documents = store.clone() as Arc<dyn DocumentStore>;
        let templates = Arc::new(TemplateResolver::new(documents.clone()));
        (
            store,
            Summarizer::new(generator, templates, documents, "gpt-4o"),
        )
    }

    #[tokio::test]
    async fn test_summarize_persists_prompt_record_and_post() {
        let generator = Arc::new(RecordingGenerator::ok());
        let (store, summarizer) = summarizer(generator.clone());

        let outcome = summarizer
            .summarize("user-1", "  um, so, hello world  ", SummarizationType::SimpleCleanup)
            .await
            .unwrap();

        assert_eq!(outcome.summary, "Cleaned note");
        assert_eq!(outcome.post.summarized_content, "Cleaned note");
        assert!(outcome.post.title.starts_with("Random Title "));

        assert_eq!(store.count(collections::PROMPTS), 1);
        assert_eq!(store.count(collections::POSTS), 1);
        let record = store.dump(collections::PROMPTS).remove(0);
        assert_eq!(record["userId"], "user-1");
        assert_eq!(record["cleanResponse"], "Cleaned note");

        // The generator saw the rendered template, not the raw transcript.
        let seen = generator.seen.lock().clone().unwrap();
        let user_message = &seen.messages[1].content;
        assert!(user_message.contains("um, so, hello world"));
        assert!(user_message.contains("Clean up and format"));
        assert!(!user_message.contains("{{recordedContent}}"));
    }

    #[tokio::test]
    async fn test_summarize_renders_domain_for_whatsapp() {
        let generator = Arc::new(RecordingGenerator::ok());
        let (_store, summarizer) = summarizer(generator.clone());

        summarizer
            .summarize("user-1", "hello", SummarizationType::WhatsappCleanup)
            .await
            .unwrap();

        let seen = generator.seen.lock().clone().unwrap();
        assert!(seen.messages[1].content.contains("whatsapp.com"));
    }

    #[tokio::test]
    async fn test_generation_failure_persists_nothing() {
        let generator = Arc::new(RecordingGenerator::failing());
        let (store, summarizer) = summarizer(generator);

        let err = summarizer
            .summarize("user-1", "hello", SummarizationType::Summarize)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Summarization(_)));
        assert_eq!(store.count(collections::PROMPTS), 0);
        assert_eq!(store.count(collections::POSTS), 0);
    }

    #[tokio::test]
    async fn test_summarize_rejects_disabled_kind() {
        let generator = Arc::new(RecordingGenerator::ok());
        let (_store, summarizer) = summarizer(generator);
        assert!(
            summarizer
                .summarize("user-1", "hello", SummarizationType::None)
                .await
                .is_err()
        );
    }
}
