//! Per-investigation projection.
//!
//! Folds the shared data frame stream into a typed status record for one
//! investigation. Each UI feature owns its own [`InvestigationWatcher`];
//! the watcher subscribes its channel on creation and unsubscribes when
//! dropped, so cleanup happens on every exit path.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use pulse_core::{Frame, InvestigationEvent};

use crate::context::RealtimeContext;

/// Maximum retained phase-update records per projection.
const EVENT_LOG_CAPACITY: usize = 256;

/// Investigation lifecycle.
///
/// `Succeeded` and `Failed` are terminal: once reached, no further event
/// changes the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Waiting to start.
    Queued,
    /// In progress.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failure.
    Failed,
}

impl Lifecycle {
    /// Returns true if no further transitions may occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One human-readable entry in the projection's audit timeline.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    /// When the record was appended (client clock).
    pub at: DateTime<Utc>,
    /// What happened.
    pub message: String,
}

/// Typed live status of one investigation.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionState {
    /// Current lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Current phase name.
    pub phase: String,
    /// Completion percentage, 0–100.
    pub progress_pct: f64,
    /// Total hypothesis count, when announced.
    pub hypotheses_total: u32,
    /// Hypotheses completed so far.
    pub hypotheses_completed: u32,
    /// Hypothesis currently executing, if any.
    pub current_hypothesis: Option<String>,
    /// Fatal error message, if the investigation failed.
    pub error: Option<String>,
    /// Identified root cause, if any.
    pub root_cause: Option<String>,
    /// Confidence in the root cause, 0.0–1.0.
    pub confidence: Option<f64>,

    log: VecDeque<PhaseRecord>,
    completed_ids: HashSet<String>,
}

impl Default for ProjectionState {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Queued,
            phase: "queued".to_string(),
            progress_pct: 0.0,
            hypotheses_total: 0,
            hypotheses_completed: 0,
            current_hypothesis: None,
            error: None,
            root_cause: None,
            confidence: None,
            log: VecDeque::new(),
            completed_ids: HashSet::new(),
        }
    }
}

impl ProjectionState {
    /// Applies one event, returning true if the projection changed.
    ///
    /// Terminal projections ignore everything. Re-applying the same
    /// logical event is safe: field transitions are absolute assignments
    /// and hypothesis completion is keyed by hypothesis id.
    pub fn apply(&mut self, event: &InvestigationEvent) -> bool {
        if self.lifecycle.is_terminal() {
            return false;
        }
        match event {
            InvestigationEvent::Started { hypotheses_total } => {
                self.lifecycle = Lifecycle::Running;
                self.phase = "discovery".to_string();
                self.progress_pct = 5.0;
                if let Some(total) = hypotheses_total {
                    self.hypotheses_total = *total;
                }
                self.record("investigation started".to_string());
            }
            InvestigationEvent::PhaseChange { phase } => {
                self.phase = phase.clone();
                self.record(format!("phase changed to {phase}"));
            }
            InvestigationEvent::Progress { progress_pct } => {
                self.progress_pct = *progress_pct;
                self.record(format!("progress {progress_pct:.0}%"));
            }
            InvestigationEvent::HypothesisComplete { hypothesis_id } => {
                match hypothesis_id {
                    Some(id) => {
                        if !self.completed_ids.insert(id.clone()) {
                            return false;
                        }
                        self.hypotheses_completed = self.completed_ids.len() as u32;
                        self.record(format!("hypothesis {id} complete"));
                    }
                    None => {
                        self.hypotheses_completed += 1;
                        self.record("hypothesis complete".to_string());
                    }
                }
            }
            InvestigationEvent::ExecutionStarted { hypothesis_id } => {
                self.phase = "executing".to_string();
                self.current_hypothesis = hypothesis_id.clone();
                let label = hypothesis_id.as_deref().unwrap_or("unknown");
                self.record(format!("executing hypothesis {label}"));
            }
            InvestigationEvent::Completed {
                success,
                root_cause,
                confidence,
            } => {
                self.lifecycle = if *success {
                    Lifecycle::Succeeded
                } else {
                    Lifecycle::Failed
                };
                self.phase = "completed".to_string();
                self.progress_pct = 100.0;
                self.root_cause = root_cause.clone();
                self.confidence = *confidence;
                self.record(format!(
                    "investigation {}",
                    if *success { "succeeded" } else { "failed" }
                ));
            }
            InvestigationEvent::Error { message, fatal: true } => {
                self.lifecycle = Lifecycle::Failed;
                self.error = Some(message.clone());
                self.record(format!("fatal error: {message}"));
            }
            InvestigationEvent::Error {
                message,
                fatal: false,
            } => {
                // Log-only: transient errors do not move the lifecycle.
                self.record(format!("error: {message}"));
            }
            InvestigationEvent::Unrecognized { event_type } => {
                self.record(format!("unrecognized event: {event_type}"));
            }
        }
        true
    }

    /// The audit timeline, oldest first.
    #[must_use]
    pub fn event_log(&self) -> impl Iterator<Item = &PhaseRecord> {
        self.log.iter()
    }

    fn record(&mut self, message: String) {
        if self.log.len() == EVENT_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(PhaseRecord {
            at: Utc::now(),
            message,
        });
    }
}

/// Derives the channel name for an investigation id.
#[must_use]
pub fn channel_for(investigation_id: &str) -> String {
    format!("investigation:{investigation_id}")
}

/// Scoped live view of one investigation.
///
/// Subscribes the investigation's channel on creation, folds matching
/// frames into a [`ProjectionState`], and unsubscribes on drop.
#[derive(Debug)]
pub struct InvestigationWatcher {
    context: RealtimeContext,
    investigation_id: String,
    channel: String,
    events: Option<broadcast::Receiver<Frame>>,
    state: ProjectionState,
}

impl InvestigationWatcher {
    /// Creates a watcher for an investigation and subscribes its channel.
    ///
    /// Frames already in the shared history are folded in immediately, so
    /// late consumers start from the best known state.
    #[must_use]
    pub fn new(context: &RealtimeContext, investigation_id: impl Into<String>) -> Self {
        let investigation_id = investigation_id.into();
        let channel = channel_for(&investigation_id);

        // Take the live receiver before reading history: a frame routed in
        // between may then be seen twice, which the reducer tolerates, while
        // the reverse order could miss it entirely.
        let events = context.events();
        context.subscribe(channel.clone());

        let mut watcher = Self {
            context: context.clone(),
            investigation_id,
            channel,
            events,
            state: ProjectionState::default(),
        };
        for frame in watcher.context.history() {
            watcher.observe(&frame);
        }
        watcher
    }

    /// The watched investigation id.
    #[must_use]
    pub fn investigation_id(&self) -> &str {
        &self.investigation_id
    }

    /// The derived channel name.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The current projected state.
    #[must_use]
    pub fn state(&self) -> &ProjectionState {
        &self.state
    }

    /// Returns true if a frame belongs to this investigation.
    ///
    /// A frame matches by channel name or by its `investigation_id`
    /// payload field. A frame satisfying both arms is still applied only
    /// once per delivery, and the reducer tolerates repeated application.
    #[must_use]
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.channel.as_deref() == Some(self.channel.as_str())
            || frame.payload_str("investigation_id") == Some(self.investigation_id.as_str())
    }

    /// Applies one frame if it is a matching data frame.
    ///
    /// Returns true if the projection changed.
    pub fn observe(&mut self, frame: &Frame) -> bool {
        if !frame.is_data() || !self.matches(frame) {
            return false;
        }
        match InvestigationEvent::from_frame(frame) {
            Some(event) => self.state.apply(&event),
            None => false,
        }
    }

    /// Drains buffered live frames without waiting.
    ///
    /// Returns the number of frames that changed the projection.
    pub fn pump(&mut self) -> usize {
        use tokio::sync::broadcast::error::TryRecvError;

        let mut frames = Vec::new();
        if let Some(events) = self.events.as_mut() {
            loop {
                match events.try_recv() {
                    Ok(frame) => frames.push(frame),
                    Err(TryRecvError::Lagged(missed)) => {
                        warn!(missed, "live stream lagged, frames skipped");
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
        frames.iter().filter(|frame| self.observe(frame)).count()
    }

    /// Waits for the next matching event and applies it.
    ///
    /// Returns `None` when the live stream is unavailable (unbound
    /// context) or closed.
    pub async fn next_event(&mut self) -> Option<InvestigationEvent> {
        use tokio::sync::broadcast::error::RecvError;

        loop {
            let frame = {
                let events = self.events.as_mut()?;
                match events.recv().await {
                    Ok(frame) => frame,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "live stream lagged, frames skipped");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            };
            if !frame.is_data() || !self.matches(&frame) {
                continue;
            }
            if let Some(event) = InvestigationEvent::from_frame(&frame) {
                self.state.apply(&event);
                return Some(event);
            }
        }
    }
}

impl Drop for InvestigationWatcher {
    fn drop(&mut self) {
        self.context.unsubscribe(self.channel.clone());
    }
}
