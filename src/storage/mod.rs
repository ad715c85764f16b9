//! Document storage abstraction.
//!
//! The pipeline only needs three operations against a document database:
//! point lookup, insert, and a filtered update with upsert semantics. The
//! trait below captures exactly that surface over JSON documents so the
//! backing store stays swappable; [`MemoryDocumentStore`] backs tests and
//! single-process deployments.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

mod memory;

pub use memory::MemoryDocumentStore;

/// Collection names shared by the pipeline stages.
pub mod collections {
    /// Seeded prompt templates, keyed by `templateId`.
    pub const PROMPT_TEMPLATES: &str = "promptTemplates";
    /// One record per text-generation call (rendered prompt + raw output).
    pub const PROMPTS: &str = "prompts";
    /// User-visible posts created from summarized transcripts.
    pub const POSTS: &str = "Post";
    /// User accounts carrying the remaining-minutes quota.
    pub const USERS: &str = "users";
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("document store error: {0}")]
    Backend(String),
}

/// Mutation applied by [`DocumentStore::update_one`].
///
/// `set` fields are always written to the matched (or inserted) document;
/// `set_on_insert` fields are written only when the upsert inserts.
#[derive(Debug, Clone, Default)]
pub struct UpdateSpec {
    pub set: Map<String, Value>,
    pub set_on_insert: Map<String, Value>,
}

impl UpdateSpec {
    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.set.insert(field.to_string(), value);
        self
    }

    pub fn set_on_insert_document(mut self, document: Value) -> Self {
        if let Value::Object(fields) = document {
            self.set_on_insert.extend(fields);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub inserted: bool,
}

/// Narrow async interface over a document database.
///
/// Filters are flat equality matches on top-level fields; that is all the
/// pipeline's keyed lookups (`templateId`, `uid`) require.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Value)
    -> Result<Option<Value>, StoreError>;

    /// Inserts the document, assigning an `_id` when absent. Returns the id.
    async fn insert_one(&self, collection: &str, document: Value) -> Result<String, StoreError>;

    async fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: UpdateSpec,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;
}
