//! Process lifecycle: store, modules, migrations, HTTP server.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use catalog_core::{BrokenReference, Catalog};
use catalog_db::{Fixture, MemoryStore, SharedStore};
use catalog_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// In-memory store, seeded from `store.seed_path` when configured.
pub async fn build_store(settings: &Settings) -> anyhow::Result<SharedStore> {
    let store = MemoryStore::new();
    if let Some(path) = settings.store.seed_path.as_deref() {
        let fixture = Fixture::from_path(Path::new(path))?;
        let loaded = fixture
            .load_into(&store)
            .await
            .with_context(|| format!("failed to seed store from {path}"))?;
        tracing::info!(seed = %path, documents = loaded, "store seeded");
    }
    Ok(Arc::new(store))
}

/// Register, initialize, migrate and start every module.
pub async fn prepare(settings: &Settings) -> anyhow::Result<(ModuleRegistry, SharedStore)> {
    let store = build_store(settings).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &store);

    let ctx = InitCtx {
        settings,
        store: &store,
    };
    registry.init_modules(&ctx).await?;
    let applied = registry.apply_migrations(&store).await?;
    tracing::info!(migrations = applied, "store migrations applied");
    registry.start_modules(&ctx).await?;

    Ok((registry, store))
}

/// Load the configured fixture under the migrations and list every book or
/// copy reference that points at a missing record.
pub async fn check_fixture(settings: &Settings) -> anyhow::Result<Vec<BrokenReference>> {
    let (registry, store) = prepare(settings).await?;
    let broken = Catalog::new(store)
        .broken_references()
        .await
        .context("reference scan failed")?;
    registry.stop_modules().await?;
    Ok(broken)
}

/// Serve until shutdown, then stop modules in reverse order.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let (registry, _store) = prepare(settings).await?;

    let served = catalog_http::start_server(&registry, settings).await;
    registry
        .stop_modules()
        .await
        .context("module shutdown failed")?;

    tracing::info!("catalog-app stopped");
    served
}
