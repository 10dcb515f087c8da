use std::collections::HashMap;

use catalog_db::{Filter, RecordId, SharedStore, Sort};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::error::{CatalogError, CatalogResult};
use crate::guard::{delete_record, Deleted};
use crate::models::{Book, BookInstance, EntityKind, Record, BOOKS, BOOK_INSTANCES};
use crate::validate::{BookInstanceForm, Validate};

use super::{insert_record, list_sorted, replace_record};

/// A copy together with the book it belongs to. `book` is `None` when the
/// referenced book no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookInstanceView {
    pub instance: Record<BookInstance>,
    pub book: Option<Record<Book>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookInstanceFormContext {
    pub books: Vec<Record<Book>>,
}

pub struct BookInstances<'a> {
    store: &'a SharedStore,
}

impl<'a> BookInstances<'a> {
    pub(super) fn new(store: &'a SharedStore) -> Self {
        Self { store }
    }

    /// All copies by imprint, each joined with its book.
    pub async fn list(&self) -> CatalogResult<Vec<BookInstanceView>> {
        let mut joined = FanOut::new(self.store)
            .filter("instances", BOOK_INSTANCES, Filter::all(), Some(Sort::asc("imprint")))
            .filter("books", BOOKS, Filter::all(), None)
            .join()
            .await?;

        let books: HashMap<RecordId, Record<Book>> = joined
            .many::<Book>("books")?
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();
        let instances: Vec<Record<BookInstance>> = joined.many("instances")?;
        Ok(instances
            .into_iter()
            .map(|instance| BookInstanceView {
                book: books.get(&instance.value.book).cloned(),
                instance,
            })
            .collect())
    }

    pub async fn detail(&self, id: &RecordId) -> CatalogResult<BookInstanceView> {
        let instance: Record<BookInstance> = self
            .store
            .find_by_id(BOOK_INSTANCES, id)
            .await?
            .map(Record::from_document)
            .transpose()?
            .ok_or_else(|| CatalogError::not_found(EntityKind::BookInstance, id))?;
        let book = self
            .store
            .find_by_id(BOOKS, &instance.value.book)
            .await?
            .map(Record::from_document)
            .transpose()?;
        Ok(BookInstanceView { instance, book })
    }

    /// Books to choose from, by title.
    pub async fn form(&self) -> CatalogResult<BookInstanceFormContext> {
        Ok(BookInstanceFormContext {
            books: list_sorted(self.store, BOOKS, Sort::asc("title")).await?,
        })
    }

    pub async fn create(&self, form: &BookInstanceForm) -> CatalogResult<Record<BookInstance>> {
        let instance = form.validate().into_result()?;
        if self.store.find_by_id(BOOKS, &instance.book).await?.is_none() {
            return Err(CatalogError::not_found(EntityKind::Book, &instance.book));
        }
        insert_record(self.store, instance).await
    }

    pub async fn update(
        &self,
        id: &RecordId,
        form: &BookInstanceForm,
    ) -> CatalogResult<Record<BookInstance>> {
        let instance = form.validate().into_result()?;
        let mut joined = FanOut::new(self.store)
            .by_id("target", BOOK_INSTANCES, id)
            .by_id("book", BOOKS, &instance.book)
            .join()
            .await?;
        if joined.one::<BookInstance>("target")?.is_none() {
            return Err(CatalogError::not_found(EntityKind::BookInstance, id));
        }
        if joined.one::<Book>("book")?.is_none() {
            return Err(CatalogError::not_found(EntityKind::Book, &instance.book));
        }
        replace_record(self.store, id, instance).await
    }

    /// Copies have no dependents; the preview is just the copy itself.
    pub async fn delete_preview(&self, id: &RecordId) -> CatalogResult<BookInstanceView> {
        self.detail(id).await
    }

    pub async fn delete(&self, id: &RecordId) -> CatalogResult<Deleted> {
        delete_record::<BookInstance>(self.store, id).await
    }
}
