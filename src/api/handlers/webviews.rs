//! Web view handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::api::{parse_id, store_error, ApiError, ApiState};
use crate::model::{NewWebView, WebView};

/// List all web views.
pub async fn list_web_views(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<WebView>>, ApiError> {
    let web_views = state.store.list_web_views().map_err(store_error)?;
    Ok(Json(web_views))
}

/// Register a web view.
pub async fn create_web_view(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<NewWebView>,
) -> Result<(StatusCode, Json<WebView>), ApiError> {
    let web_view = state.store.create_web_view(request).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(web_view)))
}

/// Get a specific web view (full record).
pub async fn get_web_view(
    State(state): State<Arc<ApiState>>,
    Path(web_view_id): Path<String>,
) -> Result<Json<WebView>, ApiError> {
    let id = parse_id(&web_view_id, "web view")?;

    let web_view = state
        .store
        .get_web_view(&id)
        .map_err(store_error)?
        .ok_or((StatusCode::NOT_FOUND, "Web view not found".to_string()))?;

    Ok(Json(web_view))
}

/// Response for web view deletion.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWebViewResponse {
    /// Pages that lost their reference.
    pub detached_pages: usize,
}

/// Delete a web view.
pub async fn delete_web_view(
    State(state): State<Arc<ApiState>>,
    Path(web_view_id): Path<String>,
) -> Result<Json<DeleteWebViewResponse>, ApiError> {
    let id = parse_id(&web_view_id, "web view")?;
    let detached_pages = state.store.delete_web_view(&id).map_err(store_error)?;
    Ok(Json(DeleteWebViewResponse { detached_pages }))
}
