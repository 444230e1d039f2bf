//! Edge Stream Relay
//!
//! A lightweight edge relay for live-stream playback built with Tokio and
//! Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                STREAM RELAY                   │
//!                      │                                               │
//!  GET /proxy?url= ────┼─▶ http/server ──▶ proxy/fetcher ──▶ origin   │
//!  ◀── streamed body ──┼── proxy/relay ◀── byte stream ◀──────────────│
//!                      │                                               │
//!  GET /ws?deviceId= ──┼─▶ http/websocket ──▶ presence/registry       │
//!  ◀── online_users ───┼── count broadcast ◀── register/deregister    │
//!                      │                                               │
//!  /api/slugs* ────────┼─▶ directory (JSON file, static credential)   │
//!                      │                                               │
//!                      │  Cross-cutting: config · lifecycle ·          │
//!                      │  observability (tracing + metrics)            │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stream_relay::config::loader::load_config;
use stream_relay::config::RelayConfig;
use stream_relay::http::HttpServer;
use stream_relay::lifecycle::Shutdown;
use stream_relay::observability::metrics;

#[derive(Parser)]
#[command(name = "stream-relay")]
#[command(about = "Edge relay for live-stream playback", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("stream-relay v0.1.0 starting");

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => load_config(&path)?,
        None => RelayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        upstream_referer = %config.upstream.referer,
        directory_enabled = config.directory.enabled,
        "Configuration loaded"
    );

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    // Metrics exporter on its own listener
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Shutdown on Ctrl+C / SIGTERM
    let shutdown = Shutdown::new();
    shutdown.spawn_signal_listener();

    // Create and run HTTP server
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
