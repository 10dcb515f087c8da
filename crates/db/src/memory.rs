//! In-process document store.
//!
//! Each operation takes the store lock exactly once, so a single call is
//! atomic. Sequences of calls are not.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Document, EntityStore, Filter, RecordId, Sort, StoreError};

#[derive(Debug, Default)]
struct Collection {
    docs: BTreeMap<RecordId, Value>,
    unique: Vec<Vec<String>>,
}

impl Collection {
    /// First unique index that `body` would collide on, ignoring `except`.
    fn collision(&self, body: &Value, except: Option<&RecordId>) -> Option<&[String]> {
        self.unique
            .iter()
            .find(|fields| {
                let key = index_key(body, fields);
                self.docs
                    .iter()
                    .any(|(id, doc)| Some(id) != except && index_key(doc, fields) == key)
            })
            .map(Vec::as_slice)
    }

    fn check_unique(
        &self,
        name: &str,
        body: &Value,
        except: Option<&RecordId>,
    ) -> Result<(), StoreError> {
        match self.collision(body, except) {
            Some(fields) => Err(StoreError::UniqueViolation {
                collection: name.to_string(),
                fields: fields.to_vec(),
            }),
            None => Ok(()),
        }
    }
}

fn index_key<'a>(body: &'a Value, fields: &[String]) -> Vec<&'a Value> {
    fields
        .iter()
        .map(|field| body.get(field).unwrap_or(&Value::Null))
        .collect()
}

/// Accepts only JSON objects and drops any caller-supplied `id` member; the
/// identifier lives beside the body, never inside it.
fn normalize(collection: &str, mut body: Value) -> Result<Value, StoreError> {
    match body.as_object_mut() {
        Some(map) => {
            map.remove("id");
            Ok(body)
        }
        None => Err(StoreError::NotAnObject {
            collection: collection.to_string(),
        }),
    }
}

/// [`EntityStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under a caller-chosen identifier (fixture loading).
    pub async fn import(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let body = normalize(collection, document.body)?;
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        target.check_unique(collection, &body, Some(&document.id))?;
        target.docs.insert(document.id, body);
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_by_id(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.get(id))
            .map(|body| Document {
                id: id.clone(),
                body: body.clone(),
            }))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|(_, body)| filter.matches(body))
                    .map(|(id, body)| Document {
                        id: id.clone(),
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = sort {
            found.sort_by(|a, b| sort.compare(&a.body, &b.body));
        }
        Ok(found)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|c| c.docs.values().filter(|body| filter.matches(body)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let body = normalize(collection, body)?;
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        target.check_unique(collection, &body, None)?;

        let id = RecordId::generate();
        target.docs.insert(id.clone(), body.clone());
        tracing::trace!(collection, %id, "document inserted");
        Ok(Document { id, body })
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        let body = normalize(collection, body)?;
        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(None);
        };
        if !target.docs.contains_key(id) {
            return Ok(None);
        }
        target.check_unique(collection, &body, Some(id))?;
        target.docs.insert(id.clone(), body.clone());
        Ok(Some(Document {
            id: id.clone(),
            body,
        }))
    }

    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|c| c.docs.remove(id))
            .is_some())
    }

    async fn ensure_unique_index(
        &self,
        collection: &str,
        fields: &[&str],
    ) -> Result<(), StoreError> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        if target.unique.contains(&fields) {
            return Ok(());
        }

        let mut seen = Vec::with_capacity(target.docs.len());
        for body in target.docs.values() {
            let key = index_key(body, &fields);
            if seen.contains(&key) {
                return Err(StoreError::UniqueViolation {
                    collection: collection.to_string(),
                    fields,
                });
            }
            seen.push(key);
        }

        tracing::debug!(collection, ?fields, "unique index registered");
        target.unique.push(fields);
        Ok(())
    }
}
