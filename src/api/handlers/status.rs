//! Status and health check handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::{store_error, ApiError, ApiState};

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Crate version.
    pub version: String,

    /// Seconds since the daemon started.
    pub uptime_secs: i64,

    /// Number of books.
    pub books: usize,

    /// Number of pages across all books.
    pub pages: usize,

    /// Pages stuck on a reorder placeholder. Should be zero.
    pub placeholder_pages: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<ApiState>>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = state.store.stats().map_err(store_error)?;

    let status = if stats.placeholder_pages == 0 { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        books: stats.books,
        pages: stats.pages,
        placeholder_pages: stats.placeholder_pages,
    }))
}
