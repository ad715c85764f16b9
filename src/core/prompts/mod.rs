//! Prompt template storage, resolution and rendering.
//!
//! Templates live in the document store and are seeded once per process
//! lifetime with `$setOnInsert` semantics, so an externally edited template
//! is never overwritten by a restart. Resolution falls back to the default
//! template before giving up.

pub mod seed;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;

use crate::errors::pipeline_error::{PipelineError, PipelineResult};
use crate::storage::{DocumentStore, collections};

pub const DEFAULT_TEMPLATE_ID: &str = "simple-cleanup";

pub const RECORDED_CONTENT_SLOT: &str = "{{recordedContent}}";
pub const DOMAIN_SLOT: &str = "{{domain}}";

/// Substituted for `{{domain}}` when the caller supplies no domain hint.
pub const DEFAULT_DOMAIN: &str = "a professional manner";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub template_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Render a template body against the transcript and an optional domain hint.
/// Every occurrence of each placeholder is substituted.
pub fn render(template: &str, recorded_content: &str, domain: Option<&str>) -> String {
    template
        .replace(RECORDED_CONTENT_SLOT, recorded_content.trim())
        .replace(DOMAIN_SLOT, domain.unwrap_or(DEFAULT_DOMAIN))
}

/// Resolves templates by id, seeding defaults exactly once per process.
pub struct TemplateResolver {
    store: Arc<dyn DocumentStore>,
    seeded: OnceCell<()>,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            seeded: OnceCell::new(),
        }
    }

    #[cfg(test)]
    fn with_seeding_disabled(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            seeded: OnceCell::new_with(Some(())),
        }
    }

    /// Idempotent seeding gate. A failed seeding attempt leaves the cell
    /// empty so the next request retries.
    pub async fn ensure_seeded(&self) -> PipelineResult<()> {
        self.seeded
            .get_or_try_init(|| seed::seed_default_templates(self.store.as_ref()))
            .await
            .map(|_| ())
    }

    /// Look up a template, falling back to the default id when the requested
    /// one is absent.
    pub async fn resolve(&self, template_id: &str) -> PipelineResult<PromptTemplate> {
        self.ensure_seeded().await?;

        if let Some(template) = self.lookup(template_id).await? {
            return Ok(template);
        }
        if template_id != DEFAULT_TEMPLATE_ID {
            tracing::warn!(
                template_id,
                "template not found, falling back to {DEFAULT_TEMPLATE_ID}"
            );
            if let Some(template) = self.lookup(DEFAULT_TEMPLATE_ID).await? {
                return Ok(template);
            }
        }
        Err(PipelineError::TemplateNotFound(template_id.to_string()))
    }

    async fn lookup(&self, template_id: &str) -> PipelineResult<Option<PromptTemplate>> {
        let document = self
            .store
            .find_one(
                collections::PROMPT_TEMPLATES,
                &json!({ "templateId": template_id }),
            )
            .await?;
        document
            .map(|doc| {
                serde_json::from_value(doc).map_err(|e| {
                    PipelineError::Storage(format!("malformed template document: {e}"))
                })
            })
            .transpose()
    }
}
