//! Concurrent-viewer presence subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket connect    → register(identity, handle)   ─┐
//! WebSocket disconnect → deregister(identity, handle) ─┼→ count broadcast
//! GET /api/online-count → count() snapshot             │   to every observer
//! ```
//!
//! # Design Decisions
//! - Unique viewers = distinct identities, not open connections
//! - Count is recomputed and published once per mutation, in mutation order
//! - The registry is an owned, injectable object shared via Arc, not a global

pub mod registry;

pub use registry::PresenceRegistry;
