use catalog_db::{Filter, SharedStore};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::error::CatalogResult;
use crate::models::{Status, AUTHORS, BOOKS, BOOK_INSTANCES, GENRES};

/// Record counts shown on the catalog home page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub book_count: u64,
    pub book_instance_count: u64,
    pub book_instance_available_count: u64,
    pub author_count: u64,
    pub genre_count: u64,
}

pub(super) async fn collect(store: &SharedStore) -> CatalogResult<Stats> {
    let mut joined = FanOut::new(store)
        .count("books", BOOKS, Filter::all())
        .count("instances", BOOK_INSTANCES, Filter::all())
        .count(
            "available",
            BOOK_INSTANCES,
            Filter::eq("status", Status::Available.as_str()),
        )
        .count("authors", AUTHORS, Filter::all())
        .count("genres", GENRES, Filter::all())
        .join()
        .await?;

    Ok(Stats {
        book_count: joined.count("books")?,
        book_instance_count: joined.count("instances")?,
        book_instance_available_count: joined.count("available")?,
        author_count: joined.count("authors")?,
        genre_count: joined.count("genres")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::testing::{FailingStore, Failure};
    use catalog_db::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_catalog_counts_zero() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        assert_eq!(collect(&store).await.unwrap(), Stats::default());
    }

    #[tokio::test]
    async fn counts_every_collection() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.insert(AUTHORS, json!({"first_name": "Jane", "last_name": "Austen"})).await.unwrap();
        store.insert(GENRES, json!({"name": "Fiction"})).await.unwrap();
        store.insert(GENRES, json!({"name": "Poetry"})).await.unwrap();
        let book = store
            .insert(BOOKS, json!({"title": "Emma", "author": "a", "summary": "s", "isbn": "i"}))
            .await
            .unwrap()
            .id;
        for status in ["Available", "Loaned", "Available"] {
            store
                .insert(BOOK_INSTANCES, json!({"book": book, "imprint": "Penguin", "status": status}))
                .await
                .unwrap();
        }

        assert_eq!(
            collect(&store).await.unwrap(),
            Stats {
                book_count: 1,
                book_instance_count: 3,
                book_instance_available_count: 2,
                author_count: 1,
                genre_count: 2,
            }
        );
    }

    #[tokio::test]
    async fn one_failed_count_fails_the_page() {
        let store: SharedStore = Arc::new(FailingStore::new(Failure::Count));
        assert!(matches!(collect(&store).await, Err(CatalogError::Store(_))));
    }
}
