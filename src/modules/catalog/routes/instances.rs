use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use catalog_core::{
    BookInstance, BookInstanceForm, BookInstanceFormContext, BookInstanceView, Catalog, Deleted,
    Record,
};
use catalog_db::RecordId;

use super::{data, ApiError, ApiResult, Payload};

pub(super) fn routes() -> Router<Catalog> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/form", get(form))
        .route("/{id}", get(detail).put(update).delete(remove))
        .route("/{id}/delete", get(delete_preview))
}

async fn list(State(catalog): State<Catalog>) -> ApiResult<Vec<BookInstanceView>> {
    Ok(data(catalog.book_instances().list().await?))
}

async fn detail(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<BookInstanceView> {
    Ok(data(catalog.book_instances().detail(&id).await?))
}

async fn form(State(catalog): State<Catalog>) -> ApiResult<BookInstanceFormContext> {
    Ok(data(catalog.book_instances().form().await?))
}

async fn create(
    State(catalog): State<Catalog>,
    Payload(form): Payload<BookInstanceForm>,
) -> Result<Response, ApiError> {
    let instance = catalog.book_instances().create(&form).await?;
    Ok((StatusCode::CREATED, data(instance)).into_response())
}

async fn update(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
    Payload(form): Payload<BookInstanceForm>,
) -> ApiResult<Record<BookInstance>> {
    Ok(data(catalog.book_instances().update(&id, &form).await?))
}

async fn delete_preview(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<BookInstanceView> {
    Ok(data(catalog.book_instances().delete_preview(&id).await?))
}

async fn remove(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<Deleted> {
    Ok(data(catalog.book_instances().delete(&id).await?))
}
