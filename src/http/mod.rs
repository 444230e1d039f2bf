//! HTTP gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → listener.rs (semaphore-bounded accept)
//!     → server.rs (Axum setup, routing, middleware)
//!     → /proxy            → proxy::fetcher + proxy::relay
//!     → /api/online-count → presence snapshot
//!     → /ws               → websocket.rs (actor per connection)
//!     → /api/slugs*       → directory router (independent state)
//! ```

pub mod listener;
pub mod server;
pub mod websocket;

pub use server::HttpServer;
