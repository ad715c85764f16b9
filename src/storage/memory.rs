//! In-memory document store.
//!
//! Backs tests and single-process deployments where no external database is
//! wired. Collections are vectors of JSON objects behind a `parking_lot`
//! read/write lock; lookups are linear scans, which is fine at the scale of
//! seeded templates and per-request inserts.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{DocumentStore, StoreError, UpdateOutcome, UpdateSpec};

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a collection, mainly for assertions in tests.
    pub fn dump(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn matches(filter: &Value, document: &Value) -> bool {
        match filter.as_object() {
            Some(fields) => fields
                .iter()
                .all(|(key, expected)| document.get(key) == Some(expected)),
            None => false,
        }
    }

    fn ensure_id(document: &mut Value) -> String {
        if let Some(id) = document.get("_id").and_then(Value::as_str) {
            return id.to_string();
        }
        let id = Uuid::new_v4().simple().to_string();
        if let Some(fields) = document.as_object_mut() {
            fields.insert("_id".to_string(), json!(id));
        }
        id
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| Self::matches(filter, doc)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut document: Value) -> Result<String, StoreError> {
        if !document.is_object() {
            return Err(StoreError::Backend(
                "only object documents can be inserted".to_string(),
            ));
        }
        let id = Self::ensure_id(&mut document);
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Value,
        update: UpdateSpec,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(doc) = docs.iter_mut().find(|doc| Self::matches(filter, doc)) {
            if let Some(fields) = doc.as_object_mut() {
                for (key, value) in update.set {
                    fields.insert(key, value);
                }
            }
            return Ok(UpdateOutcome {
                matched: 1,
                inserted: false,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }

        // Upserted documents start from the equality filter, so the document
        // remains findable by the same filter afterwards.
        let mut inserted = filter.clone();
        {
            let fields = inserted
                .as_object_mut()
                .ok_or_else(|| StoreError::Backend("upsert filter must be an object".into()))?;
            for (key, value) in update.set_on_insert {
                fields.entry(key).or_insert(value);
            }
            for (key, value) in update.set {
                fields.insert(key, value);
            }
        }
        Self::ensure_id(&mut inserted);
        docs.push(inserted);
        Ok(UpdateOutcome {
            matched: 0,
            inserted: true,
        })
    }
}
