//! Referential-integrity guard in front of deletes.

use std::marker::PhantomData;

use catalog_db::{Filter, RecordId, SharedStore};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::error::{CatalogError, CatalogResult, Dependents};
use crate::models::{Book, BookInstance, Entity, EntityKind, Record};

/// An entity whose existence can block the deletion of what it references.
pub trait Dependent: Entity {
    fn into_dependents(records: Vec<Record<Self>>) -> Dependents;
}

impl Dependent for Book {
    fn into_dependents(records: Vec<Record<Self>>) -> Dependents {
        Dependents::Books(records)
    }
}

impl Dependent for BookInstance {
    fn into_dependents(records: Vec<Record<Self>>) -> Dependents {
        Dependents::Copies(records)
    }
}

/// A target and everything currently referencing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Entity, D: Entity"))]
pub struct GuardReport<T, D> {
    pub target: Record<T>,
    pub dependents: Vec<Record<D>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub kind: EntityKind,
    pub id: RecordId,
}

/// Deletes `T` records only when no `D` record references them through
/// `reference_field`.
pub struct DeleteGuard<T, D> {
    store: SharedStore,
    reference_field: &'static str,
    _marker: PhantomData<fn() -> (T, D)>,
}

impl<T: Entity, D: Dependent> DeleteGuard<T, D> {
    pub fn new(store: &SharedStore, reference_field: &'static str) -> Self {
        Self {
            store: store.clone(),
            reference_field,
            _marker: PhantomData,
        }
    }

    /// Fetch the target and its dependents concurrently.
    pub async fn inspect(&self, id: &RecordId) -> CatalogResult<GuardReport<T, D>> {
        let mut joined = FanOut::new(&self.store)
            .by_id("target", T::KIND.collection(), id)
            .filter(
                "dependents",
                D::KIND.collection(),
                Filter::eq(self.reference_field, id),
                None,
            )
            .join()
            .await?;

        let target = joined
            .one::<T>("target")?
            .ok_or_else(|| CatalogError::not_found(T::KIND, id))?;
        Ok(GuardReport {
            target,
            dependents: joined.many::<D>("dependents")?,
        })
    }

    pub async fn delete(&self, id: &RecordId) -> CatalogResult<Deleted> {
        let report = self.inspect(id).await?;
        if !report.dependents.is_empty() {
            tracing::warn!(
                entity = %T::KIND,
                %id,
                dependents = report.dependents.len(),
                "delete blocked by dependents"
            );
            return Err(CatalogError::DependencyConflict {
                kind: T::KIND,
                id: id.clone(),
                dependents: D::into_dependents(report.dependents),
            });
        }
        delete_record::<T>(&self.store, id).await
    }
}

/// Remove a record that nothing can depend on. Reports `NotFound` when the
/// record is already gone rather than succeeding silently.
pub async fn delete_record<T: Entity>(store: &SharedStore, id: &RecordId) -> CatalogResult<Deleted> {
    if !store.delete_by_id(T::KIND.collection(), id).await? {
        return Err(CatalogError::not_found(T::KIND, id));
    }
    tracing::info!(entity = %T::KIND, %id, "record deleted");
    Ok(Deleted {
        kind: T::KIND,
        id: id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Genre, AUTHORS, BOOKS, BOOK_INSTANCES, GENRES};
    use crate::testing::{FailingStore, Failure};
    use catalog_db::{EntityStore, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    async fn insert(store: &SharedStore, collection: &str, body: serde_json::Value) -> RecordId {
        store.insert(collection, body).await.unwrap().id
    }

    fn book(author: &RecordId, genres: &[&RecordId]) -> serde_json::Value {
        json!({
            "title": "Emma",
            "author": author,
            "summary": "A comedy of manners",
            "isbn": "9780141439587",
            "genre": genres,
        })
    }

    #[tokio::test]
    async fn genre_with_books_cannot_be_deleted() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let author = insert(&store, AUTHORS, json!({"first_name": "Jane", "last_name": "Austen"})).await;
        let fiction = insert(&store, GENRES, json!({"name": "Fiction"})).await;
        let other = insert(&store, GENRES, json!({"name": "Romance"})).await;
        let first = insert(&store, BOOKS, book(&author, &[&fiction])).await;
        let second = insert(&store, BOOKS, book(&author, &[&other, &fiction])).await;
        insert(&store, BOOKS, book(&author, &[&other])).await;

        let guard = DeleteGuard::<Genre, Book>::new(&store, "genre");
        let err = guard.delete(&fiction).await.unwrap_err();
        match err {
            CatalogError::DependencyConflict {
                dependents: Dependents::Books(books),
                ..
            } => {
                let ids: Vec<_> = books.into_iter().map(|b| b.id).collect();
                assert_eq!(ids, vec![first, second]);
            }
            other => panic!("expected dependency conflict, got {other:?}"),
        }
        assert!(store.find_by_id(GENRES, &fiction).await.unwrap().is_some());
        assert_eq!(store.count(GENRES, &Filter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn author_without_books_is_deleted_alone() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let lonely = insert(&store, AUTHORS, json!({"first_name": "Ann", "last_name": "Onymous"})).await;
        let busy = insert(&store, AUTHORS, json!({"first_name": "Jane", "last_name": "Austen"})).await;
        insert(&store, BOOKS, book(&busy, &[])).await;

        let guard = DeleteGuard::<Author, Book>::new(&store, "author");
        let deleted = guard.delete(&lonely).await.unwrap();
        assert_eq!(deleted.id, lonely);
        assert_eq!(store.count(AUTHORS, &Filter::all()).await.unwrap(), 1);
        assert_eq!(store.count(BOOKS, &Filter::all()).await.unwrap(), 1);

        assert!(matches!(
            guard.delete(&busy).await,
            Err(CatalogError::DependencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn book_without_copies_is_deleted_then_gone() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let author = insert(&store, AUTHORS, json!({"first_name": "Jane", "last_name": "Austen"})).await;
        let emma = insert(&store, BOOKS, book(&author, &[])).await;

        let guard = DeleteGuard::<Book, BookInstance>::new(&store, "book");
        guard.delete(&emma).await.unwrap();
        assert!(matches!(
            guard.inspect(&emma).await,
            Err(CatalogError::NotFound { kind: EntityKind::Book, .. })
        ));
        assert!(matches!(
            guard.delete(&emma).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn book_with_copies_reports_them() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let author = insert(&store, AUTHORS, json!({"first_name": "Jane", "last_name": "Austen"})).await;
        let emma = insert(&store, BOOKS, book(&author, &[])).await;
        insert(&store, BOOK_INSTANCES, json!({"book": emma, "imprint": "Penguin", "status": "Available"})).await;

        let guard = DeleteGuard::<Book, BookInstance>::new(&store, "book");
        let report = guard.inspect(&emma).await.unwrap();
        assert_eq!(report.dependents.len(), 1);
        match guard.delete(&emma).await.unwrap_err() {
            CatalogError::DependencyConflict { dependents, .. } => {
                assert_eq!(dependents.kind(), EntityKind::BookInstance);
                assert_eq!(dependents.len(), 1);
            }
            other => panic!("expected dependency conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn copies_delete_unconditionally() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let copy = insert(&store, BOOK_INSTANCES, json!({"book": "b", "imprint": "Penguin"})).await;
        delete_record::<BookInstance>(&store, &copy).await.unwrap();
        assert!(matches!(
            delete_record::<BookInstance>(&store, &copy).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let failing = FailingStore::new(Failure::Find);
        let id = failing.inner.insert(GENRES, json!({"name": "Fiction"})).await.unwrap().id;
        let store: SharedStore = Arc::new(failing);

        let guard = DeleteGuard::<Genre, Book>::new(&store, "genre");
        assert!(matches!(guard.delete(&id).await, Err(CatalogError::Store(_))));
        assert_eq!(store.count(GENRES, &Filter::all()).await.unwrap(), 1);
    }
}
