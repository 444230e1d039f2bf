//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the stream relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Upstream fetch settings (spoofed headers, timeouts).
    pub upstream: UpstreamConfig,

    /// Presence tracking settings.
    pub presence: PresenceConfig,

    /// Slug directory settings.
    pub directory: DirectoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream fetch configuration.
///
/// The header values masquerade as a browser session on the streaming site
/// so origin-restricted media endpoints accept the request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// User-Agent header sent to the origin.
    pub user_agent: String,

    /// Referer header sent to the origin.
    pub referer: String,

    /// Origin header sent to the origin.
    pub origin: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-chunk read timeout in seconds. A hung origin terminates the
    /// relay instead of holding it open indefinitely.
    pub read_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://kick.com/".to_string(),
            origin: "https://kick.com".to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

/// Presence tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// WebSocket ping interval in seconds.
    pub ping_interval_secs: u64,

    /// Close the connection if no pong arrives within this window.
    pub pong_timeout_secs: u64,

    /// Capacity of the count broadcast channel. Observers that lag behind
    /// by more than this many events skip ahead to the latest count.
    pub broadcast_capacity: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            broadcast_capacity: 64,
        }
    }
}

/// Slug directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Enable the slug directory routes.
    pub enabled: bool,

    /// Path to the JSON file backing the directory.
    pub file_path: String,

    /// Shared-secret password gating mutations.
    pub admin_password: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_path: "slugs.json".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            admin_password: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
