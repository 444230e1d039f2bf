//! Slug directory subsystem.
//!
//! A small persisted mapping from human-friendly slugs to ordered channel-id
//! lists. Reads are public; mutations require the static credential (query
//! password) or a bearer token obtained by exchanging it. Independent of the
//! proxy/presence core: it shares a router, nothing else.

pub mod auth;
pub mod handlers;
pub mod store;

pub use auth::DirectoryState;
pub use store::SlugStore;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use self::handlers::{delete_slug, get_slug, list_slugs, put_slug};

/// Build the directory routes with their own state.
pub fn router(state: Arc<DirectoryState>) -> Router {
    Router::new()
        .route("/api/auth", post(auth::exchange_token))
        .route("/api/slugs", get(list_slugs))
        .route(
            "/api/slugs/{slug}",
            get(get_slug).put(put_slug).delete(delete_slug),
        )
        .with_state(state)
}
