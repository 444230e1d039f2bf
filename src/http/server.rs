//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS)
//! - Dispatch proxy requests to the fetcher/relay pipeline
//! - Serve presence snapshots and realtime upgrades
//! - Graceful shutdown via the lifecycle coordinator

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{PresenceConfig, RelayConfig};
use crate::directory::{self, DirectoryState, SlugStore};
use crate::directory::store::StoreError;
use crate::http::listener::{BoundedListener, ClientAddr};
use crate::http::websocket;
use crate::observability::metrics;
use crate::presence::PresenceRegistry;
use crate::proxy::{relay, FetchError, UpstreamFetcher};

/// Error type for server construction.
#[derive(Debug)]
pub enum ServerError {
    /// Outbound HTTP client could not be built.
    Client(reqwest::Error),
    /// Slug directory file could not be loaded.
    Directory(StoreError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Client(e) => write!(f, "Failed to build upstream client: {}", e),
            ServerError::Directory(e) => write!(f, "Failed to load slug directory: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<UpstreamFetcher>,
    pub presence: Arc<PresenceRegistry>,
    pub presence_config: PresenceConfig,
}

/// HTTP server for the stream relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let fetcher = Arc::new(
            UpstreamFetcher::new(config.upstream.clone()).map_err(ServerError::Client)?,
        );
        let presence = Arc::new(PresenceRegistry::new(config.presence.broadcast_capacity));

        let state = AppState {
            fetcher,
            presence,
            presence_config: config.presence.clone(),
        };

        let mut router = Self::build_router(state);

        if config.directory.enabled {
            let store = SlugStore::load(Path::new(&config.directory.file_path))
                .map_err(ServerError::Directory)?;
            let directory_state = Arc::new(DirectoryState::new(
                store,
                config.directory.admin_password.clone(),
            ));
            router = router.merge(directory::router(directory_state));
        }

        // CORS is permissive: the relay fronts browser players on arbitrary
        // origins. Request IDs are set before the trace layer so they appear
        // in every request span.
        let router = router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

        Ok(Self { router, config })
    }

    /// Build the Axum router with the core routes.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/proxy", get(proxy_handler))
            .route("/api/online-count", get(online_count_handler))
            .route("/ws", get(websocket::ws_upgrade))
            .with_state(state)
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.listener.max_connections,
            directory_enabled = self.config.directory.enabled,
            "HTTP server starting"
        );

        let listener = BoundedListener::new(listener, self.config.listener.max_connections);
        let app = self.router.into_make_service_with_connect_info::<ClientAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    url: Option<String>,
}

/// Main proxy handler: validate the target, fetch, relay.
async fn proxy_handler(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let start = Instant::now();

    // Fail fast before any outbound request is attempted.
    let url = match params.url.as_deref().filter(|u| !u.is_empty()) {
        Some(u) => u.to_string(),
        None => {
            metrics::record_proxy_request(400, start);
            return FetchError::MissingUrl.into_response();
        }
    };

    tracing::debug!(url = %url, "Proxying stream request");

    match state.fetcher.fetch(&url).await {
        Ok(fetched) => {
            metrics::record_proxy_request(fetched.status.as_u16(), start);
            relay::stream_response(fetched)
        }
        Err(e) => {
            let status = e.status_code();
            tracing::warn!(url = %url, status = %status, error = %e, "Proxy request failed");
            metrics::record_proxy_request(status.as_u16(), start);
            e.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct OnlineCount {
    count: usize,
}

/// Polling endpoint: synchronous snapshot of the unique-viewer count.
async fn online_count_handler(State(state): State<AppState>) -> Json<OnlineCount> {
    Json(OnlineCount {
        count: state.presence.count(),
    })
}
