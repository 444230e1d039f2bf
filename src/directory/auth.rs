//! Static-credential gate for directory mutations.
//!
//! Clients either pass `?password=<secret>` directly or exchange the
//! password at `POST /api/auth` for a bearer token. Tokens live for the
//! process lifetime; this is an internal tool, not an identity system.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::store::SlugStore;

/// Shared state for the directory routes.
pub struct DirectoryState {
    pub store: SlugStore,
    password: String,
    tokens: Mutex<HashSet<String>>,
}

impl DirectoryState {
    pub fn new(store: SlugStore, password: String) -> Self {
        Self {
            store,
            password,
            tokens: Mutex::new(HashSet::new()),
        }
    }

    /// Exchange the password for a fresh bearer token.
    fn exchange(&self, password: &str) -> Option<String> {
        if password != self.password {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        self.tokens
            .lock()
            .expect("token set mutex poisoned")
            .insert(token.clone());
        Some(token)
    }

    fn token_is_valid(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .expect("token set mutex poisoned")
            .contains(token)
    }

    fn password_matches(&self, candidate: &str) -> bool {
        candidate == self.password
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

/// POST /api/auth — exchange the static password for a bearer token.
pub async fn exchange_token(
    State(state): State<Arc<DirectoryState>>,
    Json(body): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    match state.exchange(&body.password) {
        Some(token) => Ok(Json(AuthResponse { token })),
        None => {
            tracing::warn!("Directory auth exchange rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Extractor that rejects unauthenticated mutation requests.
///
/// Accepts `Authorization: Bearer <token>` or a `password` query parameter.
pub struct DirectoryAuth;

impl FromRequestParts<Arc<DirectoryState>> for DirectoryAuth {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<DirectoryState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        {
            if let Some(token) = value.strip_prefix("Bearer ") {
                if state.token_is_valid(token) {
                    return Ok(DirectoryAuth);
                }
            }
        }

        if let Some(query) = parts.uri.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                if key == "password" && state.password_matches(&value) {
                    return Ok(DirectoryAuth);
                }
            }
        }

        tracing::warn!(path = %parts.uri.path(), "Unauthorized directory mutation");
        Err(StatusCode::UNAUTHORIZED)
    }
}
