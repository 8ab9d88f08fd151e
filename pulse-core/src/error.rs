//! Error types for the Pulse real-time client.
//!
//! This module provides error types for connection management, frame
//! encoding/decoding, and client operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type covering connection failures, timeouts, codec errors, and
/// client misuse.
///
/// # Examples
///
/// ```
/// use pulse_core::RealtimeError;
///
/// let error = RealtimeError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RealtimeError {
    /// Connection to the endpoint failed.
    #[error("[Realtime] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection attempt timed out.
    #[error("[Realtime] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The transport was closed.
    #[error("[Realtime] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure.
        reason: String,
    },

    /// An operation required a live connection.
    #[error("[Realtime] Not connected")]
    NotConnected,

    /// A frame could not be encoded or decoded.
    #[error("[Realtime] Codec error: {reason}")]
    Codec {
        /// Reason for the codec failure.
        reason: String,
    },
}

impl RealtimeError {
    /// Returns true if this error is recoverable (a reconnect may succeed).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::ConnectionClosed { .. }
        )
    }

    /// Creates a codec error from any displayable cause.
    pub fn codec(cause: impl std::fmt::Display) -> Self {
        Self::Codec {
            reason: cause.to_string(),
        }
    }
}
