//! Store doubles for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_db::{Document, EntityStore, Filter, MemoryStore, RecordId, Sort, StoreError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    FindById,
    Find,
    Count,
    Insert,
    Update,
    Delete,
}

/// Memory store whose chosen operation always fails.
pub struct FailingStore {
    pub inner: MemoryStore,
    failure: Failure,
}

impl FailingStore {
    pub fn new(failure: Failure) -> Self {
        Self {
            inner: MemoryStore::new(),
            failure,
        }
    }

    fn check(&self, op: Failure) -> Result<(), StoreError> {
        if self.failure == op {
            return Err(StoreError::backend(format!("{op:?} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn find_by_id(&self, c: &str, id: &RecordId) -> Result<Option<Document>, StoreError> {
        self.check(Failure::FindById)?;
        self.inner.find_by_id(c, id).await
    }

    async fn find(
        &self,
        c: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Document>, StoreError> {
        self.check(Failure::Find)?;
        self.inner.find(c, filter, sort).await
    }

    async fn count(&self, c: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.check(Failure::Count)?;
        self.inner.count(c, filter).await
    }

    async fn insert(&self, c: &str, body: Value) -> Result<Document, StoreError> {
        self.check(Failure::Insert)?;
        self.inner.insert(c, body).await
    }

    async fn update_by_id(
        &self,
        c: &str,
        id: &RecordId,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        self.check(Failure::Update)?;
        self.inner.update_by_id(c, id, body).await
    }

    async fn delete_by_id(&self, c: &str, id: &RecordId) -> Result<bool, StoreError> {
        self.check(Failure::Delete)?;
        self.inner.delete_by_id(c, id).await
    }

    async fn ensure_unique_index(&self, c: &str, fields: &[&str]) -> Result<(), StoreError> {
        self.inner.ensure_unique_index(c, fields).await
    }
}

/// Memory store whose next `n` filtered lookups come back empty, as if a
/// concurrent writer inserted right after the lookup ran.
pub struct StaleReadStore {
    pub inner: MemoryStore,
    stale_finds: AtomicUsize,
}

impl StaleReadStore {
    pub fn new(inner: MemoryStore, stale_finds: usize) -> Self {
        Self {
            inner,
            stale_finds: AtomicUsize::new(stale_finds),
        }
    }
}

#[async_trait]
impl EntityStore for StaleReadStore {
    async fn find_by_id(&self, c: &str, id: &RecordId) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(c, id).await
    }

    async fn find(
        &self,
        c: &str,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Document>, StoreError> {
        let stale = self
            .stale_finds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(Vec::new());
        }
        self.inner.find(c, filter, sort).await
    }

    async fn count(&self, c: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(c, filter).await
    }

    async fn insert(&self, c: &str, body: Value) -> Result<Document, StoreError> {
        self.inner.insert(c, body).await
    }

    async fn update_by_id(
        &self,
        c: &str,
        id: &RecordId,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.update_by_id(c, id, body).await
    }

    async fn delete_by_id(&self, c: &str, id: &RecordId) -> Result<bool, StoreError> {
        self.inner.delete_by_id(c, id).await
    }

    async fn ensure_unique_index(&self, c: &str, fields: &[&str]) -> Result<(), StoreError> {
        self.inner.ensure_unique_index(c, fields).await
    }
}
