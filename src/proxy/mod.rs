//! Streaming proxy subsystem.
//!
//! # Data Flow
//! ```text
//! GET /proxy?url=<origin URL>
//!     → fetcher.rs (outbound GET with spoofed headers)
//!     → relay.rs (status + Content-Type propagation, streamed body)
//!     → Send to client (backpressured, chunk by chunk)
//! ```
//!
//! # Design Decisions
//! - Only Content-Type is propagated from the origin response
//! - Non-2xx origin responses become plain-text errors, never partial streams
//! - Each relay owns its upstream connection; failures are isolated

pub mod fetcher;
pub mod relay;

pub use fetcher::{FetchError, FetchedStream, UpstreamFetcher};
