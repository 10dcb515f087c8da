use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use catalog_core::{Book, Catalog, Deleted, Genre, GenreDetail, GenreForm, GuardReport, Record};
use catalog_db::RecordId;

use super::{created, data, ApiError, ApiResult, Payload};

pub(super) fn routes() -> Router<Catalog> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(remove))
        .route("/{id}/delete", get(delete_preview))
}

async fn list(State(catalog): State<Catalog>) -> ApiResult<Vec<Record<Genre>>> {
    Ok(data(catalog.genres().list().await?))
}

async fn detail(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<GenreDetail> {
    Ok(data(catalog.genres().detail(&id).await?))
}

async fn create(
    State(catalog): State<Catalog>,
    Payload(form): Payload<GenreForm>,
) -> Result<Response, ApiError> {
    Ok(created(catalog.genres().create(&form).await?))
}

async fn update(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
    Payload(form): Payload<GenreForm>,
) -> ApiResult<Record<Genre>> {
    Ok(data(catalog.genres().update(&id, &form).await?))
}

async fn delete_preview(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<GuardReport<Genre, Book>> {
    Ok(data(catalog.genres().delete_preview(&id).await?))
}

async fn remove(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<Deleted> {
    Ok(data(catalog.genres().delete(&id).await?))
}
