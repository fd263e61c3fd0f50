//! Page handlers, including reorder and placeholder repair.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{parse_id, store_error, ApiError, ApiState};
use crate::model::{NewPage, ObjectId, Page, PageOrder, PagePatch};
use crate::store::RepairResult;

/// List the pages of a book in display order.
///
/// A malformed book ID yields an empty list rather than an error so list
/// screens keep rendering on bad input.
pub async fn list_pages(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<Page>>, ApiError> {
    let Ok(id) = ObjectId::parse(&book_id) else {
        warn!(book_id = %book_id, "Listing pages for malformed book ID");
        return Ok(Json(vec![]));
    };

    let pages = state.store.list_pages(&id).map_err(store_error)?;
    Ok(Json(pages))
}

/// Create a page in a book.
pub async fn create_page(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
    Json(request): Json<NewPage>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let id = parse_id(&book_id, "book")?;
    let page = state.store.create_page(&id, request).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// Get a specific page.
pub async fn get_page(
    State(state): State<Arc<ApiState>>,
    Path(page_id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    let id = parse_id(&page_id, "page")?;

    let page = state
        .store
        .get_page(&id)
        .map_err(store_error)?
        .ok_or((StatusCode::NOT_FOUND, "Page not found".to_string()))?;

    Ok(Json(page))
}

/// Edit a page's content.
pub async fn update_page(
    State(state): State<Arc<ApiState>>,
    Path(page_id): Path<String>,
    Json(patch): Json<PagePatch>,
) -> Result<Json<Page>, ApiError> {
    let id = parse_id(&page_id, "page")?;
    let page = state.store.update_page(&id, patch).map_err(store_error)?;
    Ok(Json(page))
}

/// Delete a page.
pub async fn delete_page(
    State(state): State<Arc<ApiState>>,
    Path(page_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&page_id, "page")?;
    state.store.delete_page(&id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reorder request.
///
/// Both fields are read leniently so a missing field is reported as a
/// validation error rather than a body rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Book whose pages are reordered.
    #[serde(default)]
    pub parent_id: String,

    /// List of `{ pageId, newPosition }` entries.
    #[serde(default)]
    pub page_order: serde_json::Value,
}

/// Reorder response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderResponse {
    /// Entries supplied by the caller.
    pub requested: usize,

    /// Pages actually moved.
    pub applied: usize,

    /// Entries dropped as malformed.
    pub skipped: usize,

    /// Stranded placeholders normalized during the reorder.
    pub repaired: usize,

    /// The book's pages in their new order.
    pub pages: Vec<Page>,
}

/// Move pages of a book to new positions.
///
/// POST /api/v1/pages/reorder
pub async fn reorder_pages(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let book_id = parse_id(&request.parent_id, "parent")?;

    let order = PageOrder::from_value(&request.page_order)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let result = state
        .store
        .reorder_pages(&book_id, &order.moves)
        .map_err(store_error)?;

    let requested = order.requested();
    if result.applied < requested {
        info!(
            book_id = %book_id,
            requested,
            applied = result.applied,
            skipped = order.skipped,
            "Reorder applied partially"
        );
    }

    Ok(Json(ReorderResponse {
        requested,
        applied: result.applied,
        skipped: order.skipped,
        repaired: result.repaired,
        pages: result.pages,
    }))
}

/// Normalize stranded placeholder positions in a book.
///
/// POST /api/v1/books/:id/pages/repair
pub async fn repair_pages(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<Json<RepairResult>, ApiError> {
    let id = parse_id(&book_id, "book")?;
    let result = state.store.repair_book(&id).map_err(store_error)?;
    Ok(Json(result))
}
