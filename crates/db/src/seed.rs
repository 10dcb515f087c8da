//! Fixture loading for local runs and tests.

use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::{Document, MemoryStore, RecordId, StoreError};

/// Collection name to documents, e.g. `{"genres": [{"id": "g1", "name": "Poetry"}]}`.
///
/// Documents carrying a string `id` keep it so fixtures can reference each
/// other; the rest receive a generated identifier.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct Fixture {
    pub collections: BTreeMap<String, Vec<Value>>,
}

impl Fixture {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("fixture is not a collection map")
    }

    /// Load every document into `store`; returns how many were imported.
    pub async fn load_into(self, store: &MemoryStore) -> Result<usize, StoreError> {
        let mut imported = 0;
        for (collection, docs) in self.collections {
            for body in docs {
                let id = body
                    .get("id")
                    .and_then(Value::as_str)
                    .map(RecordId::from)
                    .unwrap_or_else(RecordId::generate);
                store.import(&collection, Document { id, body }).await?;
                imported += 1;
            }
            tracing::debug!(%collection, "fixture collection loaded");
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityStore, Filter};

    #[tokio::test]
    async fn fixture_keeps_explicit_ids() {
        let fixture = Fixture::from_json(
            r#"{
                "genres": [{"id": "g-1", "name": "Poetry"}, {"name": "Drama"}],
                "books": [{"id": "b-1", "title": "Odes", "genre": ["g-1"]}]
            }"#,
        )
        .unwrap();

        let store = MemoryStore::new();
        assert_eq!(fixture.load_into(&store).await.unwrap(), 3);

        let poetry = store
            .find_by_id("genres", &RecordId::new("g-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(poetry.body["name"], "Poetry");
        assert_eq!(store.count("genres", &Filter::all()).await.unwrap(), 2);
    }

    #[test]
    fn rejects_non_map_fixtures() {
        assert!(Fixture::from_json("[1, 2]").is_err());
    }
}
