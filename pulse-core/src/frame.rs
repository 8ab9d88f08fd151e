//! Wire envelope and JSON codec.
//!
//! Every message exchanged with the server is a single JSON object, the
//! [`Frame`]. The `type` field carries either one of the reserved control
//! words (`subscribe`, `unsubscribe`, `ack`, `heartbeat`) or an
//! application-defined data type; [`Frame::classify`] maps it onto a
//! [`FrameKind`]. Frames are immutable once decoded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RealtimeError;

/// WebSocket close code for an intentional disconnect.
///
/// Any other close code is treated as abnormal and triggers reconnection.
pub const CLOSE_NORMAL: u16 = 1000;

/// Classification of a frame by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Channel subscription request.
    Subscribe,
    /// Channel unsubscription request.
    Unsubscribe,
    /// Server confirmation of a subscribe/unsubscribe request.
    Ack,
    /// Liveness signal; carries no data.
    Heartbeat,
    /// Anything else: an application data frame.
    Data,
}

/// One discrete message unit exchanged over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Wire type tag (`subscribe`, `unsubscribe`, `ack`, `heartbeat`, or a
    /// data type).
    #[serde(rename = "type")]
    pub kind: String,

    /// Logical channel this frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// For ack frames: which request is being acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// For ack frames: whether the request was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// For data frames: the application event type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Opaque key/value payload.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,

    /// Server-supplied timestamp, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Frame {
    /// Creates a subscribe request frame for a channel.
    #[must_use]
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: "subscribe".to_string(),
            channel: Some(channel.into()),
            action: None,
            success: None,
            event_type: None,
            payload: Map::new(),
            timestamp: None,
        }
    }

    /// Creates an unsubscribe request frame for a channel.
    #[must_use]
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: "unsubscribe".to_string(),
            channel: Some(channel.into()),
            action: None,
            success: None,
            event_type: None,
            payload: Map::new(),
            timestamp: None,
        }
    }

    /// Creates an ack frame, as the server would send it.
    #[must_use]
    pub fn ack(action: impl Into<String>, channel: impl Into<String>, success: bool) -> Self {
        Self {
            kind: "ack".to_string(),
            channel: Some(channel.into()),
            action: Some(action.into()),
            success: Some(success),
            event_type: None,
            payload: Map::new(),
            timestamp: None,
        }
    }

    /// Creates a heartbeat frame.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self {
            kind: "heartbeat".to_string(),
            channel: None,
            action: None,
            success: None,
            event_type: None,
            payload: Map::new(),
            timestamp: None,
        }
    }

    /// Creates a data frame carrying an application event.
    #[must_use]
    pub fn event(
        channel: impl Into<String>,
        event_type: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            kind: "event".to_string(),
            channel: Some(channel.into()),
            action: None,
            success: None,
            event_type: Some(event_type.into()),
            payload,
            timestamp: None,
        }
    }

    /// Classifies this frame by its wire type tag.
    #[must_use]
    pub fn classify(&self) -> FrameKind {
        match self.kind.as_str() {
            "subscribe" => FrameKind::Subscribe,
            "unsubscribe" => FrameKind::Unsubscribe,
            "ack" => FrameKind::Ack,
            "heartbeat" => FrameKind::Heartbeat,
            _ => FrameKind::Data,
        }
    }

    /// Returns true if this is an ack frame.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.classify() == FrameKind::Ack
    }

    /// Returns true if this is a heartbeat frame.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.classify() == FrameKind::Heartbeat
    }

    /// Returns true if this is an application data frame.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.classify() == FrameKind::Data
    }

    /// Returns a string payload field, if present.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Returns a numeric payload field, if present.
    #[must_use]
    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    /// Returns a boolean payload field, if present.
    #[must_use]
    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// Returns an unsigned integer payload field, if present.
    #[must_use]
    pub fn payload_u32(&self, key: &str) -> Option<u32> {
        self.payload
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// JSON codec for [`Frame`]s.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    /// Whether to use pretty printing for JSON.
    pub pretty: bool,
}

impl FrameCodec {
    /// Creates a new frame codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a frame to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Codec` if serialization fails.
    pub fn encode(&self, frame: &Frame) -> Result<String, RealtimeError> {
        if self.pretty {
            serde_json::to_string_pretty(frame)
        } else {
            serde_json::to_string(frame)
        }
        .map_err(RealtimeError::codec)
    }

    /// Decodes a frame from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Codec` if the input is not a valid frame.
    pub fn decode(&self, text: &str) -> Result<Frame, RealtimeError> {
        serde_json::from_str(text).map_err(RealtimeError::codec)
    }

    /// Decodes a frame from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Codec` if the input is not a valid frame.
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<Frame, RealtimeError> {
        serde_json::from_slice(bytes).map_err(RealtimeError::codec)
    }
}
