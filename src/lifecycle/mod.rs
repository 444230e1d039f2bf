//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:  load config → validate → initialize subsystems → serve
//! Shutdown: SIGTERM/SIGINT → broadcast → stop accepting → drain → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
