//! Inbound frame classification and fan-out.
//!
//! Every decoded frame is classified exactly once: acks feed the
//! subscription bookkeeping and are never exposed to consumers, heartbeats
//! are discarded, and everything else is data — appended to the bounded
//! history and published to all live subscribers in strict receipt order.

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use pulse_core::{Frame, FrameKind};

use crate::history::MessageHistory;
use crate::subscription::SubscriptionSet;

/// Classifies inbound frames and fans data frames out to consumers.
#[derive(Debug)]
pub struct MessageRouter {
    history: RwLock<MessageHistory>,
    events_tx: broadcast::Sender<Frame>,
}

impl MessageRouter {
    /// Creates a router with the given history capacity and live event
    /// buffer size.
    #[must_use]
    pub fn new(history_capacity: usize, event_buffer: usize) -> Self {
        let (events_tx, _) = broadcast::channel(event_buffer.max(1));
        Self {
            history: RwLock::new(MessageHistory::new(history_capacity)),
            events_tx,
        }
    }

    /// Returns a receiver for the live data frame stream.
    ///
    /// Receivers only observe frames routed after this call; earlier
    /// frames are available through [`MessageRouter::history`].
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Frame> {
        self.events_tx.subscribe()
    }

    /// Returns a snapshot of the retained data frames, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Frame> {
        self.history.read().snapshot()
    }

    /// Routes one decoded frame.
    ///
    /// Called only from the connection actor task, preserving transport
    /// receipt order for every consumer.
    pub(crate) fn route(&self, frame: Frame, subs: &mut SubscriptionSet) {
        match frame.classify() {
            FrameKind::Ack => self.handle_ack(&frame, subs),
            FrameKind::Heartbeat => {
                debug!("heartbeat received");
            }
            // Subscribe/unsubscribe echoes from the server carry no data;
            // treat anything that is not a control frame as data.
            FrameKind::Subscribe | FrameKind::Unsubscribe => {
                debug!(kind = %frame.kind, "ignoring control echo");
            }
            FrameKind::Data => {
                self.history.write().push(frame.clone());
                // Send fails only when no consumer is listening; that is fine.
                let _ = self.events_tx.send(frame);
            }
        }
    }

    fn handle_ack(&self, frame: &Frame, subs: &mut SubscriptionSet) {
        let Some(channel) = frame.channel.as_deref() else {
            warn!("ack frame without channel, dropping");
            return;
        };
        let action = frame.action.as_deref().unwrap_or("subscribe");
        let success = frame.success.unwrap_or(false);

        match (action, success) {
            ("subscribe", true) => {
                if subs.confirm(channel) {
                    debug!(channel = %channel, "subscription confirmed");
                } else {
                    debug!(channel = %channel, "stale subscribe ack ignored");
                }
            }
            ("subscribe", false) => {
                if subs.reject(channel) {
                    warn!(channel = %channel, "server rejected subscription");
                }
            }
            ("unsubscribe", _) => {
                // Channel already removed locally when the request was sent.
                debug!(channel = %channel, "unsubscribe acked");
            }
            (other, _) => {
                warn!(action = %other, channel = %channel, "unknown ack action");
            }
        }
    }
}
