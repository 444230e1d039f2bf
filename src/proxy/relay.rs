//! Stream relay: origin response → client response.
//!
//! # Responsibilities
//! - Propagate origin status and Content-Type to the client
//! - Forward body chunks in arrival order with backpressure
//! - Map fetch errors to mirrored-status plain-text responses
//!
//! # Design Decisions
//! - `Body::from_stream` polls the origin stream only when the client
//!   connection can accept more bytes, so a slow client throttles the
//!   origin read instead of buffering unboundedly
//! - A mid-stream origin failure terminates the client stream; the status
//!   line is already on the wire and cannot be amended

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::TryStreamExt;

use crate::proxy::fetcher::{FetchError, FetchedStream};

/// Build the streaming client response for a successful fetch.
pub fn stream_response(fetched: FetchedStream) -> Response<Body> {
    let body = Body::from_stream(
        fetched
            .body
            .map_err(|e| std::io::Error::other(format!("upstream stream failed: {}", e))),
    );

    let mut response = Response::new(body);
    *response.status_mut() = fetched.status;
    if let Some(content_type) = fetched.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

impl IntoResponse for FetchError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // Plain-text error body, mirroring the origin status when known.
        (status, self.to_string()).into_response()
    }
}
