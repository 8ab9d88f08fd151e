//! Typed investigation events.
//!
//! Inbound data frames carry loosely-typed JSON payloads. This module
//! validates them at the parse boundary into a closed union of known
//! event types; anything the client does not recognize becomes the
//! [`InvestigationEvent::Unrecognized`] variant instead of being silently
//! dropped.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// One investigation lifecycle event, decoded from a data frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvestigationEvent {
    /// The investigation started running.
    Started {
        /// Total hypothesis count, when the server announces it up front.
        #[serde(skip_serializing_if = "Option::is_none")]
        hypotheses_total: Option<u32>,
    },
    /// The investigation moved to a new phase.
    PhaseChange {
        /// New phase name.
        phase: String,
    },
    /// Progress percentage update.
    Progress {
        /// Completion percentage, 0–100.
        progress_pct: f64,
    },
    /// One hypothesis finished evaluation.
    HypothesisComplete {
        /// Identifier of the completed hypothesis, when supplied.
        #[serde(skip_serializing_if = "Option::is_none")]
        hypothesis_id: Option<String>,
    },
    /// Remediation execution began for a hypothesis.
    ExecutionStarted {
        /// Hypothesis being executed.
        #[serde(skip_serializing_if = "Option::is_none")]
        hypothesis_id: Option<String>,
    },
    /// The investigation finished.
    Completed {
        /// Whether the investigation succeeded.
        success: bool,
        /// Identified root cause, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        root_cause: Option<String>,
        /// Confidence in the root cause, 0.0–1.0.
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// The server reported an error for this investigation.
    Error {
        /// Human-readable error message.
        message: String,
        /// Whether the error terminates the investigation.
        fatal: bool,
    },
    /// An event type this client version does not know.
    Unrecognized {
        /// The unknown wire tag, kept for diagnostics.
        event_type: String,
    },
}

impl InvestigationEvent {
    /// Decodes the event carried by a data frame.
    ///
    /// Returns `None` for frames without an `event_type` tag (control
    /// frames, malformed data). Unknown tags decode to
    /// [`InvestigationEvent::Unrecognized`].
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        let event_type = frame.event_type.as_deref()?;
        Some(match event_type {
            "started" => Self::Started {
                hypotheses_total: frame.payload_u32("hypotheses_total"),
            },
            "phase_change" => Self::PhaseChange {
                phase: frame.payload_str("phase").unwrap_or_default().to_string(),
            },
            "progress" => Self::Progress {
                progress_pct: frame.payload_f64("progress_pct").unwrap_or(0.0),
            },
            "hypothesis_complete" => Self::HypothesisComplete {
                hypothesis_id: frame.payload_str("hypothesis_id").map(str::to_string),
            },
            "execution_started" => Self::ExecutionStarted {
                hypothesis_id: frame.payload_str("hypothesis_id").map(str::to_string),
            },
            "completed" => Self::Completed {
                success: frame.payload_bool("success").unwrap_or(false),
                root_cause: frame.payload_str("root_cause").map(str::to_string),
                confidence: frame.payload_f64("confidence"),
            },
            "error" => Self::Error {
                message: frame.payload_str("message").unwrap_or_default().to_string(),
                fatal: frame.payload_bool("fatal").unwrap_or(false),
            },
            other => Self::Unrecognized {
                event_type: other.to_string(),
            },
        })
    }

    /// Returns true if this event terminates the investigation lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { fatal: true, .. })
    }
}
