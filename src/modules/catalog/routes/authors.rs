use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use catalog_core::{
    AuthorDetail, AuthorForm, Author, Book, Catalog, Deleted, GuardReport, Record,
};
use catalog_db::RecordId;

use super::{created, data, ApiError, ApiResult, Payload};

pub(super) fn routes() -> Router<Catalog> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(remove))
        .route("/{id}/delete", get(delete_preview))
}

async fn list(State(catalog): State<Catalog>) -> ApiResult<Vec<Record<Author>>> {
    Ok(data(catalog.authors().list().await?))
}

async fn detail(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<AuthorDetail> {
    Ok(data(catalog.authors().detail(&id).await?))
}

async fn create(
    State(catalog): State<Catalog>,
    Payload(form): Payload<AuthorForm>,
) -> Result<Response, ApiError> {
    Ok(created(catalog.authors().create(&form).await?))
}

async fn update(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
    Payload(form): Payload<AuthorForm>,
) -> ApiResult<Record<Author>> {
    Ok(data(catalog.authors().update(&id, &form).await?))
}

async fn delete_preview(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<GuardReport<Author, Book>> {
    Ok(data(catalog.authors().delete_preview(&id).await?))
}

async fn remove(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<Deleted> {
    Ok(data(catalog.authors().delete(&id).await?))
}
