use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use catalog_core::{
    Book, BookDetail, BookForm, BookFormContext, BookInstance, BookListing, Catalog, Deleted,
    GuardReport, Record,
};
use catalog_db::RecordId;

use super::{data, ApiError, ApiResult, Payload};

pub(super) fn routes() -> Router<Catalog> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/form", get(blank_form))
        .route("/{id}", get(detail).put(update).delete(remove))
        .route("/{id}/form", get(edit_form))
        .route("/{id}/delete", get(delete_preview))
}

async fn list(State(catalog): State<Catalog>) -> ApiResult<Vec<BookListing>> {
    Ok(data(catalog.books().list().await?))
}

async fn detail(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<BookDetail> {
    Ok(data(catalog.books().detail(&id).await?))
}

async fn blank_form(State(catalog): State<Catalog>) -> ApiResult<BookFormContext> {
    Ok(data(catalog.books().form(None).await?))
}

async fn edit_form(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<BookFormContext> {
    Ok(data(catalog.books().form(Some(&id)).await?))
}

async fn create(
    State(catalog): State<Catalog>,
    Payload(form): Payload<BookForm>,
) -> Result<Response, ApiError> {
    let book = catalog.books().create(&form).await?;
    Ok((StatusCode::CREATED, data(book)).into_response())
}

async fn update(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
    Payload(form): Payload<BookForm>,
) -> ApiResult<Record<Book>> {
    Ok(data(catalog.books().update(&id, &form).await?))
}

async fn delete_preview(
    State(catalog): State<Catalog>,
    Path(id): Path<RecordId>,
) -> ApiResult<GuardReport<Book, BookInstance>> {
    Ok(data(catalog.books().delete_preview(&id).await?))
}

async fn remove(State(catalog): State<Catalog>, Path(id): Path<RecordId>) -> ApiResult<Deleted> {
    Ok(data(catalog.books().delete(&id).await?))
}
