//! Semantic configuration checks beyond what serde enforces.

use crate::config::schema::RelayConfig;

/// A single validation failure with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration. Returns all failures, not just the first.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a valid socket address: {}", config.listener.bind_address),
        });
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError {
            field: "listener.max_connections".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "upstream.connect_timeout_secs".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.upstream.user_agent.is_empty() {
        errors.push(ValidationError {
            field: "upstream.user_agent".into(),
            message: "must not be empty".into(),
        });
    }

    if config.presence.ping_interval_secs == 0 || config.presence.pong_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "presence".into(),
            message: "ping_interval_secs and pong_timeout_secs must be greater than zero".into(),
        });
    }

    if config.presence.broadcast_capacity == 0 {
        errors.push(ValidationError {
            field: "presence.broadcast_capacity".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.directory.enabled && config.directory.file_path.is_empty() {
        errors.push(ValidationError {
            field: "directory.file_path".into(),
            message: "must not be empty when the directory is enabled".into(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address".into(),
            message: format!(
                "not a valid socket address: {}",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
