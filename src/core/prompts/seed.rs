//! Default prompt templates and their idempotent seeding.

use serde_json::json;
use tracing::{error, info};

use super::PromptTemplate;
use crate::errors::pipeline_error::{PipelineError, PipelineResult};
use crate::storage::{DocumentStore, UpdateSpec, collections};
use crate::utils::now_rfc3339;

const SIMPLE_CLEANUP_BODY: &str = "Clean up and format the following transcribed content. \
Remove filler words, fix grammar, and improve readability while maintaining the original \
meaning and tone. Present only the content itself without introductory phrases or any other \
extra summary statements like \"The speaker discusses\" or \"Here's the summary.\" Ensure the \
result is in the original detected language, including specific variations where applicable, \
unless specified above.\n\nTranscribed audio: '''{{recordedContent}}'''";

const TITLE_BODY: &str = "Generate a concise, descriptive title (maximum 8 words) for the \
following transcribed content. The title should capture the main topic or purpose. Present \
only the title without any introductory phrases or explanations.\n\n\
Transcribed audio: '''{{recordedContent}}'''";

const WHATSAPP_CLEANUP_BODY: &str = "Clean up and format the following transcribed content \
for WhatsApp messaging. Apply these WhatsApp-specific formatting rules:\n\
- Use ```text``` for code snippets\n\
- Use ~text~ for strikethrough text\n\
- Use *text* for bold emphasis\n\
- Use _text_ for italic emphasis\n\
- Use numbered lists (1. 2. 3.) for ordered items\n\
- Use bullet points (\u{2022}) for unordered lists\n\
- Keep the content conversational and suitable for {{domain}} messaging\n\
- Remove filler words and clean up grammar while maintaining the original meaning\n\
- Present only the formatted content without introductory phrases\n\n\
Transcribed audio: '''{{recordedContent}}'''";

/// The official templates shipped with the service.
pub fn default_templates() -> Vec<PromptTemplate> {
    let now = now_rfc3339();
    let official = |template_id: &str, name: &str, description: &str, body: &str, tags: &[&str]| {
        PromptTemplate {
            template_id: template_id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            template: body.to_string(),
            user_id: "system".to_string(),
            is_official: true,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            created_at: now.clone(),
            updated_at: now.clone(),
        }
    };

    vec![
        official(
            "simple-cleanup",
            "Simple Cleanup",
            "Clean up and format transcribed content, removing filler words and improving readability",
            SIMPLE_CLEANUP_BODY,
            &["cleanup", "default"],
        ),
        official(
            "title",
            "Title Generation",
            "Generate concise, descriptive titles for transcribed content",
            TITLE_BODY,
            &["title", "default"],
        ),
        official(
            "whatsapp-cleanup",
            "WhatsApp Cleanup",
            "Format content specifically for WhatsApp messaging with proper syntax",
            WHATSAPP_CLEANUP_BODY,
            &["whatsapp", "messaging", "formatting"],
        ),
    ]
}

/// Upsert every default template with set-on-insert semantics: an existing
/// template with the same id is never overwritten.
pub async fn seed_default_templates(store: &dyn DocumentStore) -> PipelineResult<()> {
    for template in default_templates() {
        let document = serde_json::to_value(&template)
            .map_err(|e| PipelineError::Storage(format!("failed to encode template: {e}")))?;
        let outcome = store
            .update_one(
                collections::PROMPT_TEMPLATES,
                &json!({ "templateId": template.template_id }),
                UpdateSpec::default().set_on_insert_document(document),
                true,
            )
            .await;
        match outcome {
            Ok(result) if result.inserted => {
                info!(template_id = %template.template_id, "seeded prompt template");
            }
            Ok(_) => {}
            Err(e) => {
                error!(template_id = %template.template_id, "failed to seed template: {e}");
                return Err(e.into());
            }
        }
    }
    info!("prompt templates seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_cover_the_known_ids() {
        let templates = default_templates();
        let ids: Vec<&str> = templates
            .iter()
            .map(|template| template.template_id.as_str())
            .collect();
        assert_eq!(ids, vec!["simple-cleanup", "title", "whatsapp-cleanup"]);
        assert!(templates.iter().all(|template| template.is_official));
    }

    #[test]
    fn test_every_template_carries_the_content_slot() {
        for template in default_templates() {
            assert!(
                template.template.contains(super::super::RECORDED_CONTENT_SLOT),
                "template {} lacks the content placeholder",
                template.template_id
            );
        }
    }

    #[test]
    fn test_only_whatsapp_template_uses_the_domain_slot() {
        for template in default_templates() {
            let has_domain = template.template.contains(super::super::DOMAIN_SLOT);
            assert_eq!(has_domain, template.template_id == "whatsapp-cleanup");
        }
    }
}
