//! Entity store adapter for the catalog.
//!
//! The store is document oriented: every collection holds JSON objects keyed
//! by a store-assigned [`RecordId`]. Callers work through the object-safe
//! [`EntityStore`] trait so the engine never depends on a concrete backend.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub mod error;
pub mod filter;
pub mod memory;
pub mod seed;

pub use error::StoreError;
pub use filter::{Filter, Sort, SortDirection};
pub use memory::MemoryStore;
pub use seed::Fixture;

/// Opaque identifier assigned by the store when a document is inserted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Time-ordered identifier, so iteration order follows insertion order.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RecordId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        Value::String(id.0.clone())
    }
}

/// A stored document: its identity plus the JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: RecordId,
    pub body: Value,
}

/// Shared handle passed explicitly into every engine operation.
pub type SharedStore = Arc<dyn EntityStore>;

/// Generic typed-by-collection access to the catalog's documents.
///
/// Every call is a single round trip that the engine treats as atomic. No
/// operation spans more than one call, so callers must not assume isolation
/// between a lookup and a subsequent write.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_by_id(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    /// Replace the body of `id`. `Ok(None)` when no such document exists.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        body: Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove `id`. `Ok(false)` when no such document exists.
    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<bool, StoreError>;

    /// Declare that no two documents of `collection` may share the values of
    /// `fields`. Missing fields compare as null. Idempotent.
    async fn ensure_unique_index(
        &self,
        collection: &str,
        fields: &[&str],
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_ordered() {
        let first = RecordId::generate();
        let second = RecordId::generate();
        assert!(first < second);
    }

    #[test]
    fn record_id_serializes_as_plain_string() {
        let id = RecordId::new("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), Value::from("abc"));
        assert_eq!(Value::from(&id), Value::from("abc"));
    }
}
