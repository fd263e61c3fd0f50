//! REST API for the pageturn daemon.
//!
//! Provides HTTP endpoints for:
//! - Books (the parent aggregate)
//! - Pages, including the two-phase reorder and placeholder repair
//! - Web views embedded by pages
//! - Health status

pub mod handlers;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::model::ObjectId;
use crate::store::{PageStore, StoreError};

/// Shared state for API handlers.
pub struct ApiState {
    /// Backing store.
    pub store: Arc<PageStore>,

    /// When the daemon started.
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    /// Create new API state around a store.
    pub fn new(store: PageStore) -> Self {
        Self {
            store: Arc::new(store),
            started_at: Utc::now(),
        }
    }
}

/// Error returned by handlers: a status and a plain-text message.
pub type ApiError = (StatusCode, String);

/// Map a store error onto an HTTP status.
pub fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::BookNotFound(_)
        | StoreError::PageNotFound(_)
        | StoreError::WebViewNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::PositionConflict { .. } | StoreError::PositionOverflow(_) => {
            StatusCode::CONFLICT
        }
        StoreError::Database(_) | StoreError::Io(_) | StoreError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!(error = %e, "Store operation failed");
    }

    (status, e.to_string())
}

/// Parse an identifier from a path segment.
pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse(raw)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {} ID format", what)))
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    // Mobile clients and the admin console call from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status/health
        .route("/api/v1/status", get(handlers::status::health))
        // Books
        .route(
            "/api/v1/books",
            get(handlers::books::list_books).post(handlers::books::create_book),
        )
        .route(
            "/api/v1/books/:id",
            get(handlers::books::get_book)
                .patch(handlers::books::update_book)
                .delete(handlers::books::delete_book),
        )
        // Pages by book
        .route(
            "/api/v1/books/:id/pages",
            get(handlers::pages::list_pages).post(handlers::pages::create_page),
        )
        .route(
            "/api/v1/books/:id/pages/repair",
            post(handlers::pages::repair_pages),
        )
        // Note: /reorder must come before /:id to avoid matching "reorder" as an ID
        .route("/api/v1/pages/reorder", post(handlers::pages::reorder_pages))
        .route(
            "/api/v1/pages/:id",
            get(handlers::pages::get_page)
                .patch(handlers::pages::update_page)
                .delete(handlers::pages::delete_page),
        )
        // Web views
        .route(
            "/api/v1/webviews",
            get(handlers::webviews::list_web_views).post(handlers::webviews::create_web_view),
        )
        .route(
            "/api/v1/webviews/:id",
            get(handlers::webviews::get_web_view).delete(handlers::webviews::delete_web_view),
        )
        // Middleware
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                // Only log requests/responses that are not 2xx
                .on_request(())
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = response.status();
                    if !status.is_success() {
                        tracing::warn!(
                            status = %status,
                            latency_ms = latency.as_millis(),
                            "request failed"
                        );
                    }
                })
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("pageturn API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
