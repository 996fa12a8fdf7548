//! Book handlers.
//!
//! Each handler decodes its input, performs exactly one store operation and
//! encodes the result.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::model::{Book, BookDraft};

/// Body returned by a successful delete.
pub const DELETED_MESSAGE: &str = "Book deleted";

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(ApiError::InvalidId)
}

fn parse_draft(body: &[u8]) -> Result<BookDraft, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::InvalidPayload)
}

/// `GET /books`
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state.store.list().await?;
    Ok(Json(books))
}

/// `GET /books/{id}`
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&id)?;
    let book = state.store.get(id).await?;
    Ok(Json(book))
}

/// `POST /books`
pub async fn create_book(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let draft = parse_draft(&body)?;
    let book = state.store.insert(draft).await?;

    tracing::info!(book_id = %book.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// `PUT /books/{id}`
///
/// Overwrites both title and author; a field missing from the body becomes empty.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&id)?;
    let draft = parse_draft(&body)?;
    let book = state.store.update(id, draft).await?;

    tracing::info!(book_id = %book.id, "Book updated");
    Ok(Json(book))
}

/// `DELETE /books/{id}`
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<&'static str, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;

    tracing::info!(book_id = %id, "Book deleted");
    Ok(DELETED_MESSAGE)
}
