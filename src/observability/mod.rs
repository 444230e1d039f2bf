//! Observability subsystem.
//!
//! Structured logging goes through `tracing` (initialized in `main`);
//! metrics are exported in Prometheus format from a side listener.

pub mod metrics;
