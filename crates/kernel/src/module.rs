use async_trait::async_trait;
use axum::Router;
use catalog_db::SharedStore;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub store: &'a SharedStore,
}

/// Schema change contributed by a module: a unique index over `fields` of
/// `collection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub collection: &'static str,
    pub unique: &'static [&'static str],
}

/// Core module trait that every catalog module implements
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup before migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/api/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment for this module as JSON, merged with the others
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Start background tasks for this module
    /// Called after migrations are complete
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
