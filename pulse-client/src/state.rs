//! Connection status tracking.

use serde::{Deserialize, Serialize};

/// Connection status of the shared real-time client.
///
/// Exactly one value at a time; transitions are driven by the connection
/// actor only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not connected and not trying to be.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// Live connection; subscriptions have been replayed.
    Connected,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting,
    /// A transport error was observed; about to be re-evaluated.
    Error,
}

impl ConnectionStatus {
    /// Returns true if the connection is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the client is between connection attempts.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Error => write!(f, "error"),
        }
    }
}
