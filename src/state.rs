//! Shared application state.

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;

use crate::config::ServerConfig;
use crate::core::debug_upload::DebugUploader;
use crate::core::llm::{OpenAiGenerator, TextGenerator};
use crate::core::prompts::TemplateResolver;
use crate::core::stt::{OpenAiTranscriber, SpeechToText};
use crate::storage::{DocumentStore, MemoryDocumentStore};

pub struct AppState {
    pub config: ServerConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub object_store: Option<Arc<dyn ObjectStore>>,
    pub transcriber: Arc<dyn SpeechToText>,
    pub generator: Arc<dyn TextGenerator>,
    pub templates: Arc<TemplateResolver>,
    pub debug_uploads: Arc<DebugUploader>,
}

impl AppState {
    /// Build the production state: service clients from the config, the
    /// in-process document store, and object storage when a bucket is
    /// configured.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, String> {
        let api_key = config.openai_api_key.clone().unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; transcription requests will fail");
        }

        let transcriber: Arc<dyn SpeechToText> = Arc::new(
            OpenAiTranscriber::new(
                api_key.clone(),
                config.stt_base_url.clone(),
                config.stt_model.clone(),
            )
            .map_err(|e| e.to_string())?,
        );
        let generator: Arc<dyn TextGenerator> = Arc::new(
            OpenAiGenerator::new(api_key, config.llm_base_url.clone())
                .map_err(|e| e.to_string())?,
        );
        let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let object_store = build_object_store(&config)?;

        let state = Self::with_components(
            config,
            documents,
            object_store,
            transcriber,
            generator,
        );

        // Seed default templates at startup. A failure here is retried on
        // the first request that needs a template.
        if let Err(e) = state.templates.ensure_seeded().await {
            tracing::warn!("template seeding failed at startup: {e}");
        }

        Ok(state)
    }

    /// Assemble state from explicit components. Integration tests use this
    /// to wire mock services and in-memory stores.
    pub fn with_components(
        config: ServerConfig,
        documents: Arc<dyn DocumentStore>,
        object_store: Option<Arc<dyn ObjectStore>>,
        transcriber: Arc<dyn SpeechToText>,
        generator: Arc<dyn TextGenerator>,
    ) -> Arc<Self> {
        let templates = Arc::new(TemplateResolver::new(documents.clone()));
        let debug_uploads = Arc::new(match &object_store {
            Some(store) => DebugUploader::new(
                store.clone(),
                config.debug_s3_bucket.clone(),
                config.debug_s3_region.clone(),
                config.debug_public_url_base.clone(),
            ),
            None => DebugUploader::disabled(),
        });

        Arc::new(Self {
            config,
            documents,
            object_store,
            transcriber,
            generator,
            templates,
            debug_uploads,
        })
    }
}

fn build_object_store(config: &ServerConfig) -> Result<Option<Arc<dyn ObjectStore>>, String> {
    let Some(bucket) = &config.debug_s3_bucket else {
        return Ok(None);
    };

    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    if let Some(region) = &config.debug_s3_region {
        builder = builder.with_region(region);
    }
    if let Some(endpoint) = &config.debug_s3_endpoint {
        // Custom endpoints cover S3-compatible stores in dev environments.
        builder = builder.with_endpoint(endpoint).with_allow_http(true);
    }
    if let (Some(key), Some(secret)) = (&config.debug_s3_access_key, &config.debug_s3_secret_key)
    {
        builder = builder.with_access_key_id(key).with_secret_access_key(secret);
    }

    let store = builder
        .build()
        .map_err(|e| format!("failed to configure object storage: {e}"))?;
    Ok(Some(Arc::new(store)))
}
