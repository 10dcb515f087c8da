//! Concurrent fan-out reads joined at a single barrier.
//!
//! A [`FanOut`] collects named, independent store lookups. [`FanOut::join`]
//! runs them all concurrently and yields either every result or the first
//! failure. On failure the remaining lookups are detached: they run to
//! completion but their results are dropped.

use std::{borrow::Cow, collections::HashMap, future::Future, pin::Pin};

use catalog_db::{Document, Filter, RecordId, SharedStore, Sort, StoreError};
use tokio::task::JoinSet;

use crate::models::{Entity, Record};

/// Raw result of one lookup.
#[derive(Debug)]
pub enum Fetched {
    One(Option<Document>),
    Many(Vec<Document>),
    Count(u64),
}

type Name = Cow<'static, str>;
type FetchFuture = Pin<Box<dyn Future<Output = Result<Fetched, StoreError>> + Send>>;

pub struct FanOut {
    store: SharedStore,
    fetches: Vec<(Name, FetchFuture)>,
}

impl FanOut {
    pub fn new(store: &SharedStore) -> Self {
        Self {
            store: store.clone(),
            fetches: Vec::new(),
        }
    }

    /// Lookup by id. A missing record is a successful `None`, not an error.
    pub fn by_id(self, name: impl Into<Name>, collection: &'static str, id: &RecordId) -> Self {
        let store = self.store.clone();
        let id = id.clone();
        self.push(name, async move {
            store.find_by_id(collection, &id).await.map(Fetched::One)
        })
    }

    pub fn filter(
        self,
        name: impl Into<Name>,
        collection: &'static str,
        filter: Filter,
        sort: Option<Sort>,
    ) -> Self {
        let store = self.store.clone();
        self.push(name, async move {
            store
                .find(collection, &filter, sort.as_ref())
                .await
                .map(Fetched::Many)
        })
    }

    pub fn count(self, name: impl Into<Name>, collection: &'static str, filter: Filter) -> Self {
        let store = self.store.clone();
        self.push(name, async move {
            store.count(collection, &filter).await.map(Fetched::Count)
        })
    }

    pub fn push<F>(mut self, name: impl Into<Name>, fetch: F) -> Self
    where
        F: Future<Output = Result<Fetched, StoreError>> + Send + 'static,
    {
        self.fetches.push((name.into(), Box::pin(fetch)));
        self
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }

    pub async fn join(self) -> Result<Joined, StoreError> {
        let mut tasks = JoinSet::new();
        for (name, fetch) in self.fetches {
            tasks.spawn(async move { (name, fetch.await) });
        }

        let mut results = HashMap::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((name, Ok(fetched))) => {
                    results.insert(name, fetched);
                    continue;
                }
                Ok((name, Err(err))) => {
                    tracing::debug!(fetch = %name, error = %err, "fan-out member failed");
                    err
                }
                Err(join_err) => StoreError::backend(format!("fan-out task aborted: {join_err}")),
            };
            tasks.detach_all();
            return Err(failure);
        }

        Ok(Joined { results })
    }
}

/// Name to result map produced by a successful [`FanOut::join`].
#[derive(Debug)]
pub struct Joined {
    results: HashMap<Name, Fetched>,
}

impl Joined {
    fn take(&mut self, name: &str) -> Result<Fetched, StoreError> {
        self.results
            .remove(name)
            .ok_or_else(|| StoreError::backend(format!("fan-out has no result named `{name}`")))
    }

    pub fn one<T: Entity>(&mut self, name: &str) -> Result<Option<Record<T>>, StoreError> {
        match self.take(name)? {
            Fetched::One(doc) => doc.map(Record::from_document).transpose(),
            other => Err(mismatch(name, "one", &other)),
        }
    }

    pub fn many<T: Entity>(&mut self, name: &str) -> Result<Vec<Record<T>>, StoreError> {
        match self.take(name)? {
            Fetched::Many(docs) => docs.into_iter().map(Record::from_document).collect(),
            other => Err(mismatch(name, "many", &other)),
        }
    }

    pub fn count(&mut self, name: &str) -> Result<u64, StoreError> {
        match self.take(name)? {
            Fetched::Count(count) => Ok(count),
            other => Err(mismatch(name, "count", &other)),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn mismatch(name: &str, wanted: &str, got: &Fetched) -> StoreError {
    StoreError::backend(format!("fan-out result `{name}` is not `{wanted}`: {got:?}"))
}
