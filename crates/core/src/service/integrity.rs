use std::collections::HashSet;
use std::fmt;

use catalog_db::{Filter, RecordId, SharedStore};
use serde::Serialize;

use crate::aggregate::FanOut;
use crate::error::CatalogResult;
use crate::models::{
    Author, Book, BookInstance, EntityKind, Genre, Record, AUTHORS, BOOKS, BOOK_INSTANCES, GENRES,
};

/// A stored reference whose target does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenReference {
    pub kind: EntityKind,
    pub id: RecordId,
    pub field: &'static str,
    pub missing: EntityKind,
    pub target: RecordId,
}

impl fmt::Display for BrokenReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} has {} -> missing {} {}",
            self.kind, self.id, self.field, self.missing, self.target
        )
    }
}

fn ids<T>(records: &[Record<T>]) -> HashSet<&RecordId> {
    records.iter().map(|record| &record.id).collect()
}

/// Scans every book and copy for references to records that are gone.
pub(super) async fn broken_references(store: &SharedStore) -> CatalogResult<Vec<BrokenReference>> {
    let mut joined = FanOut::new(store)
        .filter("authors", AUTHORS, Filter::all(), None)
        .filter("genres", GENRES, Filter::all(), None)
        .filter("books", BOOKS, Filter::all(), None)
        .filter("instances", BOOK_INSTANCES, Filter::all(), None)
        .join()
        .await?;
    let authors: Vec<Record<Author>> = joined.many("authors")?;
    let genres: Vec<Record<Genre>> = joined.many("genres")?;
    let books: Vec<Record<Book>> = joined.many("books")?;
    let instances: Vec<Record<BookInstance>> = joined.many("instances")?;

    let (author_ids, genre_ids, book_ids) = (ids(&authors), ids(&genres), ids(&books));
    let mut broken = Vec::new();
    let mut check = |kind, id: &RecordId, field, missing, target: &RecordId, present: bool| {
        if !present {
            broken.push(BrokenReference {
                kind,
                id: id.clone(),
                field,
                missing,
                target: target.clone(),
            });
        }
    };

    for book in &books {
        let author = &book.value.author;
        check(
            EntityKind::Book,
            &book.id,
            "author",
            EntityKind::Author,
            author,
            author_ids.contains(author),
        );
        for genre in &book.value.genre {
            check(
                EntityKind::Book,
                &book.id,
                "genre",
                EntityKind::Genre,
                genre,
                genre_ids.contains(genre),
            );
        }
    }
    for instance in &instances {
        let book = &instance.value.book;
        check(
            EntityKind::BookInstance,
            &instance.id,
            "book",
            EntityKind::Book,
            book,
            book_ids.contains(book),
        );
    }

    if !broken.is_empty() {
        tracing::warn!(count = broken.len(), "catalog has broken references");
    }
    Ok(broken)
}
