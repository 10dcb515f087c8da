use thiserror::Error;

/// Failures surfaced by an [`crate::EntityStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique index on {collection}({}) violated", fields.join(", "))]
    UniqueViolation {
        collection: String,
        fields: Vec<String>,
    },

    #[error("document for {collection} must be a JSON object")]
    NotAnObject { collection: String },

    #[error("document codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
