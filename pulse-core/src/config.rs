//! Real-time client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the real-time client.
///
/// Contains the endpoint, credential, reconnection parameters, and buffer
/// sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint URL.
    pub endpoint: String,

    /// Bearer token appended to the connection URL as a query parameter.
    ///
    /// Issued by the session layer; the client only consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whether automatic reconnection is enabled.
    #[serde(default = "default_reconnect_enabled")]
    pub reconnect_enabled: bool,

    /// Maximum number of reconnection attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Initial reconnection delay in milliseconds; doubles on each attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Maximum reconnection delay in milliseconds.
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Number of data frames retained for late consumer inspection.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Capacity of the per-consumer live event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    60_000
}

fn default_history_capacity() -> usize {
    100
}

fn default_event_buffer() -> usize {
    256
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_enabled: default_reconnect_enabled(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            history_capacity: default_history_capacity(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl RealtimeConfig {
    /// Creates a new builder for `RealtimeConfig`.
    #[must_use]
    pub fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder::default()
    }

    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the full connection URL with the token query parameter.
    #[must_use]
    pub fn connection_url(&self) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => {
                let separator = if self.endpoint.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.endpoint, separator, token)
            }
            _ => self.endpoint.clone(),
        }
    }

    /// Returns the reconnect delay for a given attempt.
    ///
    /// The delay doubles per attempt (`base * 2^attempt`), capped at
    /// `max_reconnect_delay_ms`.
    #[must_use]
    pub fn reconnect_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self
            .reconnect_base_delay_ms
            .saturating_mul(factor)
            .min(self.max_reconnect_delay_ms);
        Duration::from_millis(delay)
    }

    /// Returns whether another reconnection attempt should be made.
    #[must_use]
    pub fn should_reconnect(&self, attempt: u32) -> bool {
        self.reconnect_enabled && attempt < self.max_reconnect_attempts
    }
}

/// Builder for `RealtimeConfig`.
#[derive(Debug, Default)]
pub struct RealtimeConfigBuilder {
    endpoint: Option<String>,
    token: Option<String>,
    connect_timeout_ms: Option<u64>,
    reconnect_enabled: Option<bool>,
    max_reconnect_attempts: Option<u32>,
    reconnect_base_delay_ms: Option<u64>,
    max_reconnect_delay_ms: Option<u64>,
    history_capacity: Option<usize>,
    event_buffer: Option<usize>,
}

impl RealtimeConfigBuilder {
    /// Sets the WebSocket endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets whether reconnection is enabled.
    #[must_use]
    pub fn reconnect_enabled(mut self, enabled: bool) -> Self {
        self.reconnect_enabled = Some(enabled);
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Sets the initial reconnection delay.
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the maximum reconnection delay.
    #[must_use]
    pub fn max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the data frame history capacity.
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Sets the live event buffer capacity.
    #[must_use]
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Builds the `RealtimeConfig`.
    #[must_use]
    pub fn build(self) -> RealtimeConfig {
        RealtimeConfig {
            endpoint: self.endpoint.unwrap_or_default(),
            token: self.token,
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            reconnect_enabled: self
                .reconnect_enabled
                .unwrap_or_else(default_reconnect_enabled),
            max_reconnect_attempts: self
                .max_reconnect_attempts
                .unwrap_or_else(default_max_reconnect_attempts),
            reconnect_base_delay_ms: self
                .reconnect_base_delay_ms
                .unwrap_or_else(default_reconnect_base_delay_ms),
            max_reconnect_delay_ms: self
                .max_reconnect_delay_ms
                .unwrap_or_else(default_max_reconnect_delay_ms),
            history_capacity: self.history_capacity.unwrap_or_else(default_history_capacity),
            event_buffer: self.event_buffer.unwrap_or_else(default_event_buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RealtimeConfig::builder()
            .endpoint("wss://dashboard.example.com/ws")
            .token("secret")
            .connect_timeout(Duration::from_secs(15))
            .max_reconnect_attempts(3)
            .build();

        assert_eq!(config.endpoint, "wss://dashboard.example.com/ws");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_reconnect_attempts, 3);
    }

    #[test]
    fn test_config_defaults() {
        let config = RealtimeConfig::default();

        assert!(config.endpoint.is_empty());
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert!(config.reconnect_enabled);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.history_capacity, 100);
    }

    #[test]
    fn test_connection_url_appends_token() {
        let config = RealtimeConfig::builder()
            .endpoint("wss://example.com/ws")
            .token("abc123")
            .build();
        assert_eq!(config.connection_url(), "wss://example.com/ws?token=abc123");

        let with_query = RealtimeConfig::builder()
            .endpoint("wss://example.com/ws?version=2")
            .token("abc123")
            .build();
        assert_eq!(
            with_query.connection_url(),
            "wss://example.com/ws?version=2&token=abc123"
        );
    }

    #[test]
    fn test_connection_url_without_token() {
        let config = RealtimeConfig::builder()
            .endpoint("ws://localhost:9000/ws")
            .build();
        assert_eq!(config.connection_url(), "ws://localhost:9000/ws");
    }

    #[test]
    fn test_exponential_backoff() {
        let config = RealtimeConfig::builder()
            .reconnect_base_delay(Duration::from_millis(1000))
            .max_reconnect_delay(Duration::from_secs(60))
            .build();

        assert_eq!(config.reconnect_delay_for(0), Duration::from_millis(1000));
        assert_eq!(config.reconnect_delay_for(1), Duration::from_millis(2000));
        assert_eq!(config.reconnect_delay_for(2), Duration::from_millis(4000));
        assert_eq!(config.reconnect_delay_for(3), Duration::from_millis(8000));
        assert_eq!(config.reconnect_delay_for(4), Duration::from_millis(16000));
        // Capped at the maximum
        assert_eq!(config.reconnect_delay_for(10), Duration::from_secs(60));
        assert_eq!(config.reconnect_delay_for(63), Duration::from_secs(60));
        assert_eq!(config.reconnect_delay_for(64), Duration::from_secs(60));
    }

    #[test]
    fn test_should_reconnect() {
        let config = RealtimeConfig::builder().max_reconnect_attempts(5).build();

        assert!(config.should_reconnect(0));
        assert!(config.should_reconnect(4));
        assert!(!config.should_reconnect(5));

        let disabled = RealtimeConfig::builder().reconnect_enabled(false).build();
        assert!(!disabled.should_reconnect(0));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = RealtimeConfig::builder()
            .endpoint("wss://example.com")
            .token("t")
            .history_capacity(50)
            .build();

        let json = serde_json::to_string(&config).unwrap();
        let parsed: RealtimeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.endpoint, parsed.endpoint);
        assert_eq!(config.token, parsed.token);
        assert_eq!(config.history_capacity, parsed.history_capacity);
    }
}
