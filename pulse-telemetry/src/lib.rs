//! # Pulse Telemetry
//!
//! Structured logging for the Pulse real-time client.
//!
//! This crate provides:
//! - **Structured Logging**: Uses `tracing` for structured, contextual logging
//! - **Multiple Formats**: JSON for ingestion, pretty-print for development
//! - **Env Overrides**: `RUST_LOG`-style filtering via `EnvFilter`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

/// Logging configuration and initialization
pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LoggingError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{init_logging, LogConfig, LogFormat};
}
