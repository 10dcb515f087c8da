//! Consistency and aggregation engine for the library catalog.
//!
//! Everything here is transport-agnostic: handlers in the application crate
//! call into [`Catalog`] and map [`CatalogError`] onto responses.

pub mod aggregate;
pub mod dedup;
pub mod error;
pub mod guard;
pub mod models;
pub mod service;
pub mod validate;

#[cfg(test)]
mod testing;

pub use dedup::Created;
pub use error::{CatalogError, CatalogResult, Dependents, FieldError};
pub use guard::{Deleted, GuardReport};
pub use models::{Author, Book, BookInstance, Entity, EntityKind, Genre, Keyed, Record, Status};
pub use service::{
    AuthorDetail, BookDetail, BookFormContext, BookInstanceFormContext, BookInstanceView,
    BookListing, BrokenReference, Catalog, GenreDetail, GenreOption, Stats,
};
pub use validate::{AuthorForm, BookForm, BookInstanceForm, GenreForm, Validate};
