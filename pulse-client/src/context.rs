//! Shared broadcast context.
//!
//! A single [`RealtimeContext`] instance is constructed at application
//! start and handed to every feature that wants live updates. Optional
//! features that may run outside the provisioning scope get the
//! [`RealtimeContext::Unbound`] variant: an inert fallback whose
//! operations are no-ops, so they degrade gracefully instead of failing.

use tokio::sync::{broadcast, watch};
use tracing::warn;

use pulse_core::Frame;

use crate::client::RealtimeHandle;
use crate::state::ConnectionStatus;
use crate::subscription::SubscriptionSnapshot;

/// The application-wide real-time context.
///
/// Exactly one `Bound` instance should exist per running application; all
/// consumers share it. `Unbound` is the defensive fallback for consumers
/// constructed outside the provisioning scope.
#[derive(Debug, Clone)]
pub enum RealtimeContext {
    /// Backed by a live client task.
    Bound(RealtimeHandle),
    /// Inert fallback: idle status, empty history, no-op operations.
    Unbound,
}

impl RealtimeContext {
    /// Wraps a client handle.
    #[must_use]
    pub fn bound(handle: RealtimeHandle) -> Self {
        Self::Bound(handle)
    }

    /// Creates the inert fallback context.
    #[must_use]
    pub fn unbound() -> Self {
        Self::Unbound
    }

    /// Returns true if this context is backed by a client.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    /// Current connection status; `Idle` when unbound.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Bound(handle) => handle.status(),
            Self::Unbound => ConnectionStatus::Idle,
        }
    }

    /// Watch receiver for status transitions, when bound.
    #[must_use]
    pub fn watch_status(&self) -> Option<watch::Receiver<ConnectionStatus>> {
        match self {
            Self::Bound(handle) => Some(handle.watch_status()),
            Self::Unbound => None,
        }
    }

    /// Retained data frames, oldest first; empty when unbound.
    #[must_use]
    pub fn history(&self) -> Vec<Frame> {
        match self {
            Self::Bound(handle) => handle.history(),
            Self::Unbound => Vec::new(),
        }
    }

    /// Live data frame stream, when bound.
    #[must_use]
    pub fn events(&self) -> Option<broadcast::Receiver<Frame>> {
        match self {
            Self::Bound(handle) => Some(handle.events()),
            Self::Unbound => None,
        }
    }

    /// Sends an application payload; no-op with a warning when unbound or
    /// not connected.
    pub fn send(&self, payload: serde_json::Value) -> bool {
        match self {
            Self::Bound(handle) => handle.send(payload),
            Self::Unbound => {
                warn!("send on unbound realtime context, dropping payload");
                false
            }
        }
    }

    /// Subscribes to a channel; no-op when unbound.
    pub fn subscribe(&self, channel: impl Into<String>) {
        match self {
            Self::Bound(handle) => handle.subscribe(channel),
            Self::Unbound => warn!("subscribe on unbound realtime context ignored"),
        }
    }

    /// Unsubscribes from a channel; no-op when unbound.
    pub fn unsubscribe(&self, channel: impl Into<String>) {
        match self {
            Self::Bound(handle) => handle.unsubscribe(channel),
            Self::Unbound => {}
        }
    }

    /// Subscription set snapshot; empty when unbound.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionSnapshot {
        match self {
            Self::Bound(handle) => handle.subscriptions(),
            Self::Unbound => SubscriptionSnapshot::default(),
        }
    }
}
