//! Per-entity catalog operations built on the aggregator, dedup resolver
//! and delete guard.

mod authors;
mod books;
mod genres;
mod instances;
mod integrity;
mod stats;

pub use authors::{AuthorDetail, Authors};
pub use books::{BookDetail, BookFormContext, BookListing, Books, GenreOption};
pub use genres::{GenreDetail, Genres};
pub use instances::{BookInstanceFormContext, BookInstanceView, BookInstances};
pub use integrity::BrokenReference;
pub use stats::Stats;

use catalog_db::{Filter, RecordId, SharedStore, Sort, StoreError};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Entity, Record};

/// Entry point to the engine. Cheap to clone; holds only the store handle.
#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
}

impl Catalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn authors(&self) -> Authors<'_> {
        Authors::new(&self.store)
    }

    pub fn genres(&self) -> Genres<'_> {
        Genres::new(&self.store)
    }

    pub fn books(&self) -> Books<'_> {
        Books::new(&self.store)
    }

    pub fn book_instances(&self) -> BookInstances<'_> {
        BookInstances::new(&self.store)
    }

    pub async fn stats(&self) -> CatalogResult<Stats> {
        stats::collect(&self.store).await
    }

    /// Book and copy references whose target record is missing.
    pub async fn broken_references(&self) -> CatalogResult<Vec<BrokenReference>> {
        integrity::broken_references(&self.store).await
    }
}

async fn insert_record<T: Entity>(store: &SharedStore, value: T) -> CatalogResult<Record<T>> {
    let body = serde_json::to_value(&value).map_err(StoreError::from)?;
    let doc = store.insert(T::KIND.collection(), body).await?;
    tracing::info!(entity = %T::KIND, id = %doc.id, "record created");
    Ok(Record { id: doc.id, value })
}

async fn replace_record<T: Entity>(
    store: &SharedStore,
    id: &RecordId,
    value: T,
) -> CatalogResult<Record<T>> {
    let body = serde_json::to_value(&value).map_err(StoreError::from)?;
    match store.update_by_id(T::KIND.collection(), id, body).await? {
        Some(doc) => {
            tracing::info!(entity = %T::KIND, %id, "record updated");
            Ok(Record { id: doc.id, value })
        }
        None => Err(CatalogError::not_found(T::KIND, id)),
    }
}

/// Full scan of one collection in `sort` order.
async fn list_sorted<T: Entity>(
    store: &SharedStore,
    collection: &str,
    sort: Sort,
) -> CatalogResult<Vec<Record<T>>> {
    let docs = store.find(collection, &Filter::all(), Some(&sort)).await?;
    Ok(docs
        .into_iter()
        .map(Record::from_document)
        .collect::<Result<_, _>>()?)
}
