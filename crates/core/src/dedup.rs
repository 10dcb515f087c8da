//! Dedup-on-write for entities with a natural key.
//!
//! The lookup and the write are separate store calls. The store's unique
//! index on the natural key closes the gap between them: a write that loses
//! a race fails with a unique violation, which is resolved here the same way
//! a lookup hit would have been.

use catalog_db::{Filter, RecordId, SharedStore, StoreError};
use serde_json::Value;

use crate::aggregate::FanOut;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Keyed, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode<'a> {
    Create,
    Update(&'a RecordId),
}

impl WriteMode<'_> {
    fn is_self(&self, id: &RecordId) -> bool {
        matches!(self, WriteMode::Update(own) if *own == id)
    }
}

/// Result of a create: either a fresh record or the one already holding the key.
#[derive(Debug, Clone, PartialEq)]
pub enum Created<T> {
    New(Record<T>),
    Existing(Record<T>),
}

impl<T> Created<T> {
    pub fn is_new(&self) -> bool {
        matches!(self, Created::New(_))
    }

    pub fn record(&self) -> &Record<T> {
        match self {
            Created::New(record) | Created::Existing(record) => record,
        }
    }

    pub fn into_record(self) -> Record<T> {
        match self {
            Created::New(record) | Created::Existing(record) => record,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Vacant,
    Taken(Record<T>),
}

/// Exact-match filter over `T::KEY_FIELDS`; absent values match null.
pub fn natural_key<T: Keyed>(value: &T) -> Result<Filter, StoreError> {
    let body = serde_json::to_value(value)?;
    Ok(T::KEY_FIELDS.iter().fold(Filter::all(), |filter, field| {
        filter.and_eq(*field, body.get(*field).cloned().unwrap_or(Value::Null))
    }))
}

fn resolve_matches<T: Keyed>(
    matches: Vec<Record<T>>,
    mode: WriteMode<'_>,
) -> CatalogResult<Resolution<T>> {
    match matches.into_iter().find(|record| !mode.is_self(&record.id)) {
        None => Ok(Resolution::Vacant),
        Some(existing) => match mode {
            WriteMode::Create => Ok(Resolution::Taken(existing)),
            WriteMode::Update(_) => Err(CatalogError::Conflict {
                kind: T::KIND,
                existing: existing.id,
            }),
        },
    }
}

/// Look for another record holding `value`'s natural key.
///
/// Create: a hit is returned as [`Resolution::Taken`]. Update: a hit on a
/// different record is a [`CatalogError::Conflict`]; a hit on the record
/// being updated is ignored.
pub async fn resolve<T: Keyed>(
    store: &SharedStore,
    value: &T,
    mode: WriteMode<'_>,
) -> CatalogResult<Resolution<T>> {
    let key = natural_key(value)?;
    let matches = store
        .find(T::KIND.collection(), &key, None)
        .await?
        .into_iter()
        .map(Record::from_document)
        .collect::<Result<Vec<_>, _>>()?;
    resolve_matches(matches, mode)
}

/// Insert `value` unless a record with the same natural key exists.
pub async fn create<T: Keyed>(store: &SharedStore, value: T) -> CatalogResult<Created<T>> {
    if let Resolution::Taken(existing) = resolve(store, &value, WriteMode::Create).await? {
        tracing::info!(entity = %T::KIND, id = %existing.id, "create resolved to existing record");
        return Ok(Created::Existing(existing));
    }

    let body = serde_json::to_value(&value).map_err(StoreError::from)?;
    match store.insert(T::KIND.collection(), body).await {
        Ok(doc) => {
            tracing::info!(entity = %T::KIND, id = %doc.id, "record created");
            Ok(Created::New(Record { id: doc.id, value }))
        }
        Err(err) if err.is_unique_violation() => {
            tracing::warn!(entity = %T::KIND, "concurrent create won the natural key");
            match resolve(store, &value, WriteMode::Create).await? {
                Resolution::Taken(existing) => Ok(Created::Existing(existing)),
                Resolution::Vacant => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Replace record `id` with `value`, refusing to take another record's key.
pub async fn update<T: Keyed>(
    store: &SharedStore,
    id: &RecordId,
    value: T,
) -> CatalogResult<Record<T>> {
    let collection = T::KIND.collection();
    let mut joined = FanOut::new(store)
        .by_id("target", collection, id)
        .filter("same_key", collection, natural_key(&value)?, None)
        .join()
        .await?;

    if joined.one::<T>("target")?.is_none() {
        return Err(CatalogError::not_found(T::KIND, id));
    }
    resolve_matches(joined.many::<T>("same_key")?, WriteMode::Update(id))?;

    let body = serde_json::to_value(&value).map_err(StoreError::from)?;
    match store.update_by_id(collection, id, body).await {
        Ok(Some(doc)) => {
            tracing::info!(entity = %T::KIND, %id, "record updated");
            Ok(Record { id: doc.id, value })
        }
        Ok(None) => Err(CatalogError::not_found(T::KIND, id)),
        Err(err) if err.is_unique_violation() => {
            tracing::warn!(entity = %T::KIND, %id, "concurrent write took the natural key");
            resolve(store, &value, WriteMode::Update(id)).await?;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
