pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use catalog_core::{
    models::{AUTHORS, GENRES},
    Author, Catalog, Genre, Keyed,
};
use catalog_db::SharedStore;
use catalog_kernel::{InitCtx, Migration, Module};
use serde_json::json;

/// Authors, genres, books and copies behind one JSON API
pub struct CatalogModule {
    catalog: Catalog,
}

impl CatalogModule {
    pub fn new(store: &SharedStore) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
        }
    }
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    /// Unique natural keys; these back the duplicate check on create.
    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_author_natural_key",
                collection: AUTHORS,
                unique: Author::KEY_FIELDS,
            },
            Migration {
                id: "002_genre_name",
                collection: GENRES,
                unique: Genre::KEY_FIELDS,
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let stats = self.catalog.stats().await?;
        tracing::info!(
            module = self.name(),
            books = stats.book_count,
            copies = stats.book_instance_count,
            authors = stats.author_count,
            genres = stats.genre_count,
            "catalog module started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

/// Create a new instance of the catalog module over `store`
pub fn create_module(store: &SharedStore) -> Arc<dyn Module> {
    Arc::new(CatalogModule::new(store))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn data_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": { "data": schema },
                    "required": ["data"]
                }
            }
        }
    })
}

fn schema_ref(name: &str) -> serde_json::Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn array_of(name: &str) -> serde_json::Value {
    json!({ "type": "array", "items": schema_ref(name) })
}

/// Paths for one entity collection: list/create, detail/update/delete and
/// the delete preview.
fn collection_paths(
    paths: &mut serde_json::Map<String, serde_json::Value>,
    segment: &str,
    tag: &str,
    schema: &str,
    form: &str,
) {
    let body = json!({
        "required": true,
        "content": { "application/json": { "schema": schema_ref(form) } }
    });
    let id_param = json!([{ "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }]);

    paths.insert(
        format!("/{segment}"),
        json!({
            "get": {
                "summary": format!("List {segment}"),
                "tags": [tag],
                "responses": {
                    "200": data_response("Listing", array_of(schema)),
                    "500": error_response("Store failure")
                }
            },
            "post": {
                "summary": format!("Create {segment}"),
                "tags": [tag],
                "requestBody": body.clone(),
                "responses": {
                    "201": data_response("Created", schema_ref(schema)),
                    "200": data_response("Already present; `existing` is true", schema_ref(schema)),
                    "404": error_response("Referenced record missing"),
                    "422": error_response("Validation failed")
                }
            }
        }),
    );

    paths.insert(
        format!("/{segment}/{{id}}"),
        json!({
            "get": {
                "summary": format!("Get one of {segment}"),
                "tags": [tag],
                "parameters": id_param.clone(),
                "responses": {
                    "200": data_response("Detail", json!({ "type": "object" })),
                    "404": error_response("Not found")
                }
            },
            "put": {
                "summary": format!("Update one of {segment}"),
                "tags": [tag],
                "parameters": id_param.clone(),
                "requestBody": body,
                "responses": {
                    "200": data_response("Updated", schema_ref(schema)),
                    "404": error_response("Not found"),
                    "409": error_response("Natural key already taken"),
                    "422": error_response("Validation failed")
                }
            },
            "delete": {
                "summary": format!("Delete one of {segment}"),
                "tags": [tag],
                "parameters": id_param.clone(),
                "responses": {
                    "200": data_response("Deleted", schema_ref("Deleted")),
                    "404": error_response("Not found"),
                    "409": error_response("Still referenced; dependents in details")
                }
            }
        }),
    );

    paths.insert(
        format!("/{segment}/{{id}}/delete"),
        json!({
            "get": {
                "summary": format!("Preview deleting one of {segment}"),
                "tags": [tag],
                "parameters": id_param,
                "responses": {
                    "200": data_response("Target and dependents", json!({ "type": "object" })),
                    "404": error_response("Not found")
                }
            }
        }),
    );
}

fn openapi_fragment() -> serde_json::Value {
    let mut paths = serde_json::Map::new();
    paths.insert(
        "/".to_string(),
        json!({
            "get": {
                "summary": "Catalog record counts",
                "tags": ["Catalog"],
                "responses": {
                    "200": data_response("Counts", schema_ref("Stats")),
                    "500": error_response("Store failure")
                }
            }
        }),
    );
    collection_paths(&mut paths, "authors", "Authors", "Author", "AuthorForm");
    collection_paths(&mut paths, "genres", "Genres", "Genre", "GenreForm");
    collection_paths(&mut paths, "books", "Books", "Book", "BookForm");
    collection_paths(
        &mut paths,
        "bookinstances",
        "Book instances",
        "BookInstance",
        "BookInstanceForm",
    );
    for (path, summary) in [
        ("/books/form", "Authors and genres for a new book"),
        ("/books/{id}/form", "Authors and genres for editing a book"),
        ("/bookinstances/form", "Books for a new copy"),
    ] {
        paths.insert(
            path.to_string(),
            json!({
                "get": {
                    "summary": summary,
                    "responses": { "200": data_response("Form context", json!({ "type": "object" })) }
                }
            }),
        );
    }

    let string = json!({ "type": "string" });
    let date = json!({ "type": "string", "format": "date" });
    let ids = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "paths": paths,
        "components": {
            "schemas": {
                "Stats": {
                    "type": "object",
                    "properties": {
                        "book_count": { "type": "integer" },
                        "book_instance_count": { "type": "integer" },
                        "book_instance_available_count": { "type": "integer" },
                        "author_count": { "type": "integer" },
                        "genre_count": { "type": "integer" }
                    }
                },
                "Author": {
                    "type": "object",
                    "properties": {
                        "id": string, "url": string, "first_name": string, "last_name": string,
                        "date_of_birth": date, "date_of_death": date,
                        "name": string, "lifespan": string
                    },
                    "required": ["id", "first_name", "last_name"]
                },
                "AuthorForm": {
                    "type": "object",
                    "properties": {
                        "first_name": string, "last_name": string,
                        "date_of_birth": string, "date_of_death": string
                    }
                },
                "Genre": {
                    "type": "object",
                    "properties": { "id": string, "url": string, "name": string },
                    "required": ["id", "name"]
                },
                "GenreForm": {
                    "type": "object",
                    "properties": { "name": string }
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": string, "url": string, "title": string, "author": string,
                        "summary": string, "isbn": string, "genre": ids
                    },
                    "required": ["id", "title", "author", "summary", "isbn"]
                },
                "BookForm": {
                    "type": "object",
                    "properties": {
                        "title": string, "author": string, "summary": string, "isbn": string,
                        "genre": { "oneOf": [string, ids] }
                    }
                },
                "BookInstance": {
                    "type": "object",
                    "properties": {
                        "id": string, "url": string, "book": string, "imprint": string,
                        "status": { "type": "string", "enum": ["Available", "Maintenance", "Loaned", "Reserved"] },
                        "due_back": date, "due_back_formatted": string
                    },
                    "required": ["id", "book", "imprint", "status"]
                },
                "BookInstanceForm": {
                    "type": "object",
                    "properties": {
                        "book": string, "imprint": string, "status": string, "due_back": string
                    }
                },
                "Deleted": {
                    "type": "object",
                    "properties": { "kind": string, "id": string },
                    "required": ["kind", "id"]
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_db::{EntityStore, MemoryStore, StoreError};
    use catalog_kernel::{settings::Settings, ModuleRegistry};

    #[tokio::test]
    async fn migrations_make_genre_names_unique() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut registry = ModuleRegistry::new();
        registry.register(create_module(&store));
        assert_eq!(registry.apply_migrations(&store).await.unwrap(), 2);

        store.insert(GENRES, json!({"name": "Fiction"})).await.unwrap();
        let err = store.insert(GENRES, json!({"name": "Fiction"})).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn lifecycle_hooks_succeed_on_an_empty_store() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };
        let module = CatalogModule::new(&store);
        module.init(&ctx).await.unwrap();
        module.start(&ctx).await.unwrap();
        module.stop().await.unwrap();
    }

    #[test]
    fn openapi_fragment_covers_every_collection() {
        let spec = openapi_fragment();
        for path in ["/", "/authors", "/genres/{id}", "/books/{id}/delete", "/bookinstances/form"] {
            assert!(spec["paths"][path].is_object(), "missing {path}");
        }
        assert!(spec["components"]["schemas"]["BookInstance"].is_object());
    }
}
