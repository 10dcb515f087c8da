use catalog_db::{Filter, RecordId, SharedStore, Sort};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::dedup::{self, Created};
use crate::error::{CatalogError, CatalogResult};
use crate::guard::{DeleteGuard, Deleted, GuardReport};
use crate::models::{Book, EntityKind, Genre, Record, BOOKS, GENRES};
use crate::validate::{GenreForm, Validate};

use super::list_sorted;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreDetail {
    pub genre: Record<Genre>,
    pub books: Vec<Record<Book>>,
}

pub struct Genres<'a> {
    store: &'a SharedStore,
}

impl<'a> Genres<'a> {
    pub(super) fn new(store: &'a SharedStore) -> Self {
        Self { store }
    }

    fn guard(&self) -> DeleteGuard<Genre, Book> {
        DeleteGuard::new(self.store, "genre")
    }

    pub async fn list(&self) -> CatalogResult<Vec<Record<Genre>>> {
        list_sorted(self.store, GENRES, Sort::asc("name")).await
    }

    pub async fn detail(&self, id: &RecordId) -> CatalogResult<GenreDetail> {
        let mut joined = FanOut::new(self.store)
            .by_id("genre", GENRES, id)
            .filter("books", BOOKS, Filter::eq("genre", id), Some(Sort::asc("title")))
            .join()
            .await?;

        let genre = joined
            .one("genre")?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Genre, id))?;
        Ok(GenreDetail {
            genre,
            books: joined.many("books")?,
        })
    }

    pub async fn create(&self, form: &GenreForm) -> CatalogResult<Created<Genre>> {
        let genre = form.validate().into_result()?;
        dedup::create(self.store, genre).await
    }

    pub async fn update(&self, id: &RecordId, form: &GenreForm) -> CatalogResult<Record<Genre>> {
        let genre = form.validate().into_result()?;
        dedup::update(self.store, id, genre).await
    }

    pub async fn delete_preview(&self, id: &RecordId) -> CatalogResult<GuardReport<Genre, Book>> {
        self.guard().inspect(id).await
    }

    pub async fn delete(&self, id: &RecordId) -> CatalogResult<Deleted> {
        self.guard().delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{CatalogError, Dependents};
    use crate::models::{Genre, GENRES};
    use crate::service::Catalog;
    use crate::validate::GenreForm;
    use catalog_db::{Filter, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    fn named(name: &str) -> GenreForm {
        GenreForm {
            name: Some(name.into()),
        }
    }

    #[tokio::test]
    async fn fiction_with_two_books_survives_delete() {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        let fiction = catalog.genres().create(&named("Fiction")).await.unwrap().into_record();
        for title in ["Emma", "Dracula"] {
            catalog
                .store()
                .insert(
                    "books",
                    json!({"title": title, "author": "a", "summary": "s", "isbn": "i", "genre": [fiction.id]}),
                )
                .await
                .unwrap();
        }

        match catalog.genres().delete(&fiction.id).await.unwrap_err() {
            CatalogError::DependencyConflict {
                dependents: Dependents::Books(books),
                ..
            } => assert_eq!(books.len(), 2),
            other => panic!("expected dependency conflict, got {other:?}"),
        }
        let detail = catalog.genres().detail(&fiction.id).await.unwrap();
        assert_eq!(detail.genre.value, Genre { name: "Fiction".into() });
        assert_eq!(detail.books[0].value.title, "Dracula");
    }

    #[tokio::test]
    async fn unused_genre_is_deleted() {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        let poetry = catalog.genres().create(&named("Poetry")).await.unwrap().into_record();
        let preview = catalog.genres().delete_preview(&poetry.id).await.unwrap();
        assert!(preview.dependents.is_empty());

        catalog.genres().delete(&poetry.id).await.unwrap();
        assert_eq!(catalog.store().count(GENRES, &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_genre_resolves_to_existing() {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        let first = catalog.genres().create(&named("Poetry")).await.unwrap();
        let again = catalog.genres().create(&named("Poetry")).await.unwrap();
        assert_eq!(first.record().id, again.record().id);

        let names: Vec<_> = catalog
            .genres()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.value.name)
            .collect();
        assert_eq!(names, vec!["Poetry"]);
    }
}
