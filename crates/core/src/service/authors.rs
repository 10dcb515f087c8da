use catalog_db::{Filter, RecordId, SharedStore, Sort};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::dedup::{self, Created};
use crate::error::{CatalogError, CatalogResult};
use crate::guard::{DeleteGuard, Deleted, GuardReport};
use crate::models::{Author, Book, EntityKind, Record, AUTHORS, BOOKS};
use crate::validate::{AuthorForm, Validate};

use super::list_sorted;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorDetail {
    pub author: Record<Author>,
    pub books: Vec<Record<Book>>,
}

pub struct Authors<'a> {
    store: &'a SharedStore,
}

impl<'a> Authors<'a> {
    pub(super) fn new(store: &'a SharedStore) -> Self {
        Self { store }
    }

    fn guard(&self) -> DeleteGuard<Author, Book> {
        DeleteGuard::new(self.store, "author")
    }

    /// All authors by last name.
    pub async fn list(&self) -> CatalogResult<Vec<Record<Author>>> {
        list_sorted(self.store, AUTHORS, Sort::asc("last_name")).await
    }

    pub async fn detail(&self, id: &RecordId) -> CatalogResult<AuthorDetail> {
        tracing::debug!(%id, "author detail");
        let mut joined = FanOut::new(self.store)
            .by_id("author", AUTHORS, id)
            .filter("books", BOOKS, Filter::eq("author", id), Some(Sort::asc("title")))
            .join()
            .await?;

        let author = joined
            .one("author")?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Author, id))?;
        Ok(AuthorDetail {
            author,
            books: joined.many("books")?,
        })
    }

    pub async fn create(&self, form: &AuthorForm) -> CatalogResult<Created<Author>> {
        let author = form.validate().into_result()?;
        dedup::create(self.store, author).await
    }

    pub async fn update(&self, id: &RecordId, form: &AuthorForm) -> CatalogResult<Record<Author>> {
        let author = form.validate().into_result()?;
        dedup::update(self.store, id, author).await
    }

    pub async fn delete_preview(&self, id: &RecordId) -> CatalogResult<GuardReport<Author, Book>> {
        self.guard().inspect(id).await
    }

    pub async fn delete(&self, id: &RecordId) -> CatalogResult<Deleted> {
        self.guard().delete(id).await
    }
}
