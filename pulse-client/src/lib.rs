//! # Pulse Client
//!
//! Resilient shared real-time event client for dashboard UIs.
//!
//! This crate provides:
//! - A connection manager with automatic reconnection and exponential
//!   backoff ([`RealtimeClient`] / [`RealtimeHandle`])
//! - Channel subscription bookkeeping that survives disconnects and is
//!   replayed on every new connection
//! - Inbound frame routing with a bounded history and ordered fan-out to
//!   any number of consumers
//! - A shared application-wide context with an inert fallback for optional
//!   consumers ([`RealtimeContext`])
//! - Per-investigation projections folding the event stream into typed UI
//!   state ([`InvestigationWatcher`])
//!
//! One client task owns the single transport for the whole application;
//! every feature talks to it through cheap handle clones.
//!
//! # Example
//!
//! ```ignore
//! use pulse_client::{InvestigationWatcher, RealtimeClient, RealtimeContext};
//! use pulse_core::RealtimeConfig;
//!
//! let config = RealtimeConfig::builder()
//!     .endpoint("wss://dashboard.example.com/ws")
//!     .token(session_token)
//!     .build();
//!
//! let handle = RealtimeClient::spawn(config);
//! handle.connect();
//! let context = RealtimeContext::bound(handle);
//!
//! let mut watcher = InvestigationWatcher::new(&context, "42");
//! while let Some(event) = watcher.next_event().await {
//!     println!("{:?} -> {:?}", event, watcher.state().lifecycle);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

/// Connection manager and client task
pub mod client;

/// Shared application-wide context
pub mod context;

/// Bounded data frame history
pub mod history;

/// Per-investigation projections
pub mod projection;

/// Inbound frame routing and fan-out
pub mod router;

/// Connection status
pub mod state;

/// Subscription bookkeeping
pub mod subscription;

pub use client::{RealtimeClient, RealtimeHandle};
pub use context::RealtimeContext;
pub use history::MessageHistory;
pub use projection::{channel_for, InvestigationWatcher, Lifecycle, PhaseRecord, ProjectionState};
pub use router::MessageRouter;
pub use state::ConnectionStatus;
pub use subscription::{SubscriptionSet, SubscriptionSnapshot};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{RealtimeClient, RealtimeHandle};
    pub use crate::context::RealtimeContext;
    pub use crate::projection::{InvestigationWatcher, Lifecycle, ProjectionState};
    pub use crate::state::ConnectionStatus;
    pub use pulse_core::prelude::*;
}
