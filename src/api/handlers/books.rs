//! Book handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::{parse_id, store_error, ApiError, ApiState};
use crate::model::{Book, BookPatch, NewBook};

/// List all books, newest first.
pub async fn list_books(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state.store.list_books().map_err(store_error)?;
    Ok(Json(books))
}

/// Create a book.
pub async fn create_book(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.store.create_book(request).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a specific book.
pub async fn get_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&book_id, "book")?;

    let book = state
        .store
        .get_book(&id)
        .map_err(store_error)?
        .ok_or((StatusCode::NOT_FOUND, "Book not found".to_string()))?;

    Ok(Json(book))
}

/// Update a book's fields.
pub async fn update_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>, ApiError> {
    let id = parse_id(&book_id, "book")?;
    let book = state.store.update_book(&id, patch).map_err(store_error)?;
    Ok(Json(book))
}

/// Delete a book together with its pages.
pub async fn delete_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&book_id, "book")?;
    state.store.delete_book(&id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
