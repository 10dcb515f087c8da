pub mod catalog;

use catalog_db::SharedStore;
use catalog_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: &SharedStore) {
    registry.register(catalog::create_module(store));
}
