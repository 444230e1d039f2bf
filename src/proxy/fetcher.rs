//! Upstream fetch with spoofed request headers.
//!
//! # Responsibilities
//! - Validate the requested URL (absolute, http/https)
//! - Issue the outbound GET masquerading as a browser on the streaming site
//! - Hand back status, Content-Type, and a lazy byte stream
//! - Translate transport failures into the relay error taxonomy

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header;
use url::Url;

use crate::config::UpstreamConfig;

/// Errors surfaced by a proxy call, each with an HTTP mapping.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Client omitted the `url` parameter (or sent an empty one).
    #[error("missing stream URL")]
    MissingUrl,

    /// The `url` parameter is not an absolute http(s) URL.
    #[error("invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Origin was reachable but answered with a failure status.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: StatusCode },

    /// Origin unreachable, connect timeout, or transport failure.
    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// HTTP status this error maps to at the gateway boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FetchError::MissingUrl | FetchError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            FetchError::UpstreamStatus { status } => *status,
            FetchError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A successful fetch: origin status, Content-Type if any, and the lazy body.
///
/// The stream is finite and non-restartable; consuming (or dropping) it is
/// what releases the underlying origin connection.
pub struct FetchedStream {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for FetchedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedStream")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Issues origin requests with the configured spoofed header set.
pub struct UpstreamFetcher {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamFetcher {
    /// Build the fetcher and its shared HTTP client.
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch `url` from the origin.
    ///
    /// Returns the response metadata and a byte stream that yields chunks
    /// lazily; a non-2xx origin status is reported as `UpstreamStatus`
    /// before any body is consumed.
    pub async fn fetch(&self, url: &str) -> Result<FetchedStream, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(header::REFERER, &self.config.referer)
            .header(header::ORIGIN, &self.config.origin)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Origin rejected proxied request");
            return Err(FetchError::UpstreamStatus { status });
        }

        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

        Ok(FetchedStream {
            status,
            content_type,
            body: response.bytes_stream().boxed(),
        })
    }
}
