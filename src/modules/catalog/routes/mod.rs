//! JSON handlers for the catalog module, mounted under `/api/catalog`.

mod authors;
mod books;
mod genres;
mod instances;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use catalog_core::{CatalogError, Catalog, Created, Entity, Stats};
use catalog_http::AppError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

pub fn router(catalog: Catalog) -> Router {
    Router::new()
        .route("/", get(home))
        .nest("/authors", authors::routes())
        .nest("/genres", genres::routes())
        .nest("/books", books::routes())
        .nest("/bookinstances", instances::routes())
        .with_state(catalog)
}

/// `{"data": ...}` success envelope.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub type ApiResult<T> = Result<Json<Data<T>>, ApiError>;

fn data<T>(value: T) -> Json<Data<T>> {
    Json(Data { data: value })
}

/// 201 for a fresh record, 200 flagged `existing` when dedup found a match.
fn created<T: Entity>(outcome: Created<T>) -> Response {
    match outcome {
        Created::New(record) => (StatusCode::CREATED, data(record)).into_response(),
        Created::Existing(record) => (
            StatusCode::OK,
            Json(json!({ "data": record, "existing": true })),
        )
            .into_response(),
    }
}

async fn home(State(catalog): State<Catalog>) -> ApiResult<Stats> {
    Ok(data(catalog.stats().await?))
}

/// Engine outcome rendered through the shared error envelope.
#[derive(Debug)]
pub struct ApiError(CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self(err)
    }
}

impl From<ApiError> for AppError {
    fn from(ApiError(err): ApiError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound { .. } => AppError::not_found(message),
            CatalogError::Validation { errors, draft, .. } => {
                let details = errors
                    .into_iter()
                    .map(|e| json!({ "field": e.field, "message": e.message, "value": draft[e.field] }))
                    .collect();
                AppError::validation(details, message)
            }
            CatalogError::Conflict { kind, existing } => AppError::conflict(
                vec![json!({ "existing": existing, "url": kind.url(&existing) })],
                message,
            ),
            CatalogError::DependencyConflict { dependents, .. } => {
                let details = match serde_json::to_value(&dependents) {
                    Ok(serde_json::Value::Array(items)) => items,
                    Ok(other) => vec![other],
                    Err(err) => return AppError::Internal(err.into()),
                };
                AppError::dependency_conflict(details, message)
            }
            CatalogError::Store(err) => AppError::Internal(err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// `Json` whose rejections use the shared error envelope.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use catalog_core::Catalog;
    use catalog_db::MemoryStore;
    use serde_json::Value;
    use tower::ServiceExt;

    pub fn app() -> (Router, Catalog) {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        (super::router(catalog.clone()), catalog)
    }

    pub async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }
}
