//! Outcome taxonomy shared by every catalog operation.

use catalog_db::{RecordId, StoreError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Book, BookInstance, EntityKind, Record};

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Records that reference an entity and therefore block its deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Dependents {
    Books(Vec<Record<Book>>),
    Copies(Vec<Record<BookInstance>>),
}

impl Dependents {
    pub fn len(&self) -> usize {
        match self {
            Self::Books(books) => books.len(),
            Self::Copies(copies) => copies.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Books(_) => EntityKind::Book,
            Self::Copies(_) => EntityKind::BookInstance,
        }
    }
}

/// Everything a catalog operation can report besides success.
///
/// All variants except [`CatalogError::Store`] are expected outcomes the
/// caller shows to the user; `Store` is fatal for the current request.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("{kind} failed validation with {} error(s)", errors.len())]
    Validation {
        kind: EntityKind,
        errors: Vec<FieldError>,
        /// Normalized but unsaved input, for redisplay.
        draft: Value,
    },

    #[error("{kind} conflicts with existing record {existing}")]
    Conflict { kind: EntityKind, existing: RecordId },

    #[error("{kind} {id} is still referenced by {} {}(s)", dependents.len(), dependents.kind())]
    DependencyConflict {
        kind: EntityKind,
        id: RecordId,
        dependents: Dependents,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn not_found(kind: EntityKind, id: &RecordId) -> Self {
        Self::NotFound {
            kind,
            id: id.clone(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
