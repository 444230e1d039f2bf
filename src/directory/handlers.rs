//! CRUD handlers for the slug directory.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::directory::auth::{DirectoryAuth, DirectoryState};
use crate::directory::store::StoreError;

/// GET /api/slugs — full directory listing. Reads are public.
pub async fn list_slugs(
    State(state): State<Arc<DirectoryState>>,
) -> Json<Vec<(String, Vec<String>)>> {
    Json(state.store.list())
}

/// GET /api/slugs/{slug} — ordered channel list for one slug.
pub async fn get_slug(
    State(state): State<Arc<DirectoryState>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<String>>, StatusCode> {
    state.store.get(&slug).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// PUT /api/slugs/{slug} — upsert the channel list. Auth required.
pub async fn put_slug(
    State(state): State<Arc<DirectoryState>>,
    _auth: DirectoryAuth,
    Path(slug): Path<String>,
    Json(channels): Json<Vec<String>>,
) -> Result<StatusCode, StatusCode> {
    state.store.upsert(&slug, channels).map_err(store_error)?;
    tracing::info!(slug = %slug, "Slug upserted");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/slugs/{slug} — remove a slug. Auth required.
pub async fn delete_slug(
    State(state): State<Arc<DirectoryState>>,
    _auth: DirectoryAuth,
    Path(slug): Path<String>,
) -> Result<StatusCode, StatusCode> {
    if state.store.remove(&slug).map_err(store_error)? {
        tracing::info!(slug = %slug, "Slug removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn store_error(e: StoreError) -> StatusCode {
    tracing::error!(error = %e, "Slug store write failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
