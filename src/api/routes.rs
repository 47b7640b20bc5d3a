//! Request handlers for the course tree endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use super::error::ApiError;
use super::protocol::{CoursesResponse, FolderResponse, MessageResponse, StatusResponse};
use crate::config::Config;
use crate::sync::TreeCacheSync;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<TreeCacheSync>,
    pub config: Arc<Config>,
}

pub async fn courses_handler(
    State(state): State<AppState>,
) -> Result<Json<CoursesResponse>, ApiError> {
    let root_id = state.config.root_folder_id()?;

    let courses = state.sync.get_complete_structure(root_id).await?;
    Ok(Json(CoursesResponse { courses }))
}

pub async fn folder_handler(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> Result<Json<FolderResponse>, ApiError> {
    debug!(folder_id = %folder_id, "Folder contents requested");
    let contents = state.sync.get_folder_contents(&folder_id).await?;
    Ok(Json(FolderResponse { contents }))
}

pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.sync.invalidate_all();
    Json(MessageResponse {
        message: "Cache cleared successfully".to_string(),
    })
}

pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.sync.status().await;
    Json(StatusResponse {
        upstream: status.upstream.status,
        cache: status.cache,
        recent_errors: status.upstream.recent_errors,
    })
}
