use std::collections::HashMap;

use catalog_db::{Filter, RecordId, SharedStore, Sort};
use serde::Serialize;

use crate::aggregate::{FanOut, Joined};
use crate::error::{CatalogError, CatalogResult};
use crate::guard::{DeleteGuard, Deleted, GuardReport};
use crate::models::{
    Author, Book, BookInstance, EntityKind, Genre, Record, AUTHORS, BOOKS, BOOK_INSTANCES, GENRES,
};
use crate::validate::{BookForm, Validate};

use super::{insert_record, replace_record};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookListing {
    pub book: Record<Book>,
    pub author: Option<Record<Author>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDetail {
    pub book: Record<Book>,
    pub author: Option<Record<Author>>,
    pub genres: Vec<Record<Genre>>,
    pub instances: Vec<Record<BookInstance>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreOption {
    #[serde(flatten)]
    pub genre: Record<Genre>,
    pub checked: bool,
}

/// Everything a book form needs: choices plus the book being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookFormContext {
    pub authors: Vec<Record<Author>>,
    pub genres: Vec<GenreOption>,
    pub book: Option<Record<Book>>,
}

fn genre_slot(id: &RecordId) -> String {
    format!("genre:{id}")
}

fn distinct_genres(book: &Book) -> Vec<&RecordId> {
    let mut ids: Vec<&RecordId> = Vec::with_capacity(book.genre.len());
    for id in &book.genre {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Adds one lookup for the author and one per distinct genre of `book`.
fn with_references(mut fan_out: FanOut, book: &Book) -> FanOut {
    fan_out = fan_out.by_id("ref:author", AUTHORS, &book.author);
    for genre in distinct_genres(book) {
        fan_out = fan_out.by_id(genre_slot(genre), GENRES, genre);
    }
    fan_out
}

type References<'b> = (Option<Record<Author>>, Vec<(&'b RecordId, Option<Record<Genre>>)>);

fn take_references<'b>(joined: &mut Joined, book: &'b Book) -> CatalogResult<References<'b>> {
    let author = joined.one("ref:author")?;
    let genres = distinct_genres(book)
        .into_iter()
        .map(|id| joined.one(&genre_slot(id)).map(|genre| (id, genre)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((author, genres))
}

pub struct Books<'a> {
    store: &'a SharedStore,
}

impl<'a> Books<'a> {
    pub(super) fn new(store: &'a SharedStore) -> Self {
        Self { store }
    }

    fn guard(&self) -> DeleteGuard<Book, BookInstance> {
        DeleteGuard::new(self.store, "book")
    }

    /// All books by title, each joined with its author.
    pub async fn list(&self) -> CatalogResult<Vec<BookListing>> {
        let mut joined = FanOut::new(self.store)
            .filter("books", BOOKS, Filter::all(), Some(Sort::asc("title")))
            .filter("authors", AUTHORS, Filter::all(), None)
            .join()
            .await?;

        let authors: HashMap<RecordId, Record<Author>> = joined
            .many::<Author>("authors")?
            .into_iter()
            .map(|author| (author.id.clone(), author))
            .collect();
        let books: Vec<Record<Book>> = joined.many("books")?;
        Ok(books
            .into_iter()
            .map(|book| BookListing {
                author: authors.get(&book.value.author).cloned(),
                book,
            })
            .collect())
    }

    pub async fn detail(&self, id: &RecordId) -> CatalogResult<BookDetail> {
        tracing::debug!(%id, "book detail");
        let mut joined = FanOut::new(self.store)
            .by_id("book", BOOKS, id)
            .filter("instances", BOOK_INSTANCES, Filter::eq("book", id), None)
            .join()
            .await?;
        let book: Record<Book> = joined
            .one("book")?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Book, id))?;
        let instances = joined.many("instances")?;

        let mut refs = with_references(FanOut::new(self.store), &book.value)
            .join()
            .await?;
        let (author, genres) = take_references(&mut refs, &book.value)?;
        let genres = genres.into_iter().filter_map(|(_, genre)| genre).collect();

        Ok(BookDetail {
            book,
            author,
            genres,
            instances,
        })
    }

    /// Authors and genres to choose from, with `id`'s genres checked.
    pub async fn form(&self, id: Option<&RecordId>) -> CatalogResult<BookFormContext> {
        let mut fan_out = FanOut::new(self.store)
            .filter("authors", AUTHORS, Filter::all(), Some(Sort::asc("last_name")))
            .filter("genres", GENRES, Filter::all(), Some(Sort::asc("name")));
        if let Some(id) = id {
            fan_out = fan_out.by_id("book", BOOKS, id);
        }
        let mut joined = fan_out.join().await?;

        let book: Option<Record<Book>> = match id {
            Some(id) => Some(
                joined
                    .one("book")?
                    .ok_or_else(|| CatalogError::not_found(EntityKind::Book, id))?,
            ),
            None => None,
        };
        let selected = book.as_ref().map(|b| b.value.genre.as_slice()).unwrap_or_default();
        let genres = joined
            .many::<Genre>("genres")?
            .into_iter()
            .map(|genre| GenreOption {
                checked: selected.contains(&genre.id),
                genre,
            })
            .collect();

        Ok(BookFormContext {
            authors: joined.many("authors")?,
            genres,
            book,
        })
    }

    pub async fn create(&self, form: &BookForm) -> CatalogResult<Record<Book>> {
        let book = form.validate().into_result()?;
        let mut joined = with_references(FanOut::new(self.store), &book).join().await?;
        ensure_references(&mut joined, &book)?;
        insert_record(self.store, book).await
    }

    pub async fn update(&self, id: &RecordId, form: &BookForm) -> CatalogResult<Record<Book>> {
        let book = form.validate().into_result()?;
        let fan_out = FanOut::new(self.store).by_id("target", BOOKS, id);
        let mut joined = with_references(fan_out, &book).join().await?;
        if joined.one::<Book>("target")?.is_none() {
            return Err(CatalogError::not_found(EntityKind::Book, id));
        }
        ensure_references(&mut joined, &book)?;
        replace_record(self.store, id, book).await
    }

    pub async fn delete_preview(
        &self,
        id: &RecordId,
    ) -> CatalogResult<GuardReport<Book, BookInstance>> {
        self.guard().inspect(id).await
    }

    pub async fn delete(&self, id: &RecordId) -> CatalogResult<Deleted> {
        self.guard().delete(id).await
    }
}

fn ensure_references(joined: &mut Joined, book: &Book) -> CatalogResult<()> {
    let (author, genres) = take_references(joined, book)?;
    if author.is_none() {
        return Err(CatalogError::not_found(EntityKind::Author, &book.author));
    }
    if let Some((id, _)) = genres.iter().find(|(_, genre)| genre.is_none()) {
        return Err(CatalogError::not_found(EntityKind::Genre, id));
    }
    Ok(())
}
