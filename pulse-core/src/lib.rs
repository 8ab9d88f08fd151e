//! # Pulse Core
//!
//! Core types for the Pulse real-time event client.
//!
//! This crate provides:
//! - The wire envelope ([`Frame`]) and its JSON codec ([`FrameCodec`])
//! - A closed typed union of known investigation events ([`InvestigationEvent`])
//! - Client configuration with reconnection/backoff parameters ([`RealtimeConfig`])
//! - Error types shared across the client ([`RealtimeError`])
//!
//! No IO happens in this crate; it is pure data and parsing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Client configuration
pub mod config;

/// Error types
pub mod error;

/// Typed investigation events
pub mod event;

/// Wire envelope and codec
pub mod frame;

pub use config::{RealtimeConfig, RealtimeConfigBuilder};
pub use error::RealtimeError;
pub use event::InvestigationEvent;
pub use frame::{Frame, FrameCodec, FrameKind, CLOSE_NORMAL};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{RealtimeConfig, RealtimeConfigBuilder};
    pub use crate::error::RealtimeError;
    pub use crate::event::InvestigationEvent;
    pub use crate::frame::{Frame, FrameCodec, FrameKind};
}
