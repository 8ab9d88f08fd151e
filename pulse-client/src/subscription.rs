//! Channel subscription bookkeeping.
//!
//! Tracks three sets of channel names: *desired* (what consumers want),
//! *pending* (subscribe sent, awaiting ack), and *confirmed* (acked on the
//! current connection). The sets survive disconnects: desired channels are
//! replayed on every new connection, while pending/confirmed only describe
//! the current transport.
//!
//! Invariants, maintained by every operation:
//! - `pending ∪ confirmed ⊆ desired`
//! - `pending ∩ confirmed = ∅`

use std::collections::HashSet;

/// Snapshot of the subscription sets, for introspection and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    /// Channels consumers currently want.
    pub desired: Vec<String>,
    /// Channels with an in-flight subscribe request.
    pub pending: Vec<String>,
    /// Channels acked by the server on the current connection.
    pub confirmed: Vec<String>,
}

/// Desired/pending/confirmed channel bookkeeping.
///
/// Pure data structure; the connection actor is its only writer.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    desired: HashSet<String>,
    pending: HashSet<String>,
    confirmed: HashSet<String>,
}

impl SubscriptionSet {
    /// Creates an empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a consumer wants a channel.
    ///
    /// Returns true if the channel was not already desired.
    pub fn request(&mut self, channel: &str) -> bool {
        self.desired.insert(channel.to_string())
    }

    /// Returns true if a subscribe frame still needs to be sent for the
    /// channel on the current connection.
    #[must_use]
    pub fn needs_subscribe(&self, channel: &str) -> bool {
        self.desired.contains(channel)
            && !self.pending.contains(channel)
            && !self.confirmed.contains(channel)
    }

    /// Marks a desired channel as having an in-flight subscribe request.
    pub fn mark_pending(&mut self, channel: &str) {
        if self.desired.contains(channel) {
            self.confirmed.remove(channel);
            self.pending.insert(channel.to_string());
        }
    }

    /// Removes a channel from every set.
    ///
    /// Returns true if the channel was desired.
    pub fn remove(&mut self, channel: &str) -> bool {
        self.pending.remove(channel);
        self.confirmed.remove(channel);
        self.desired.remove(channel)
    }

    /// Applies a successful subscribe ack: moves the channel from pending
    /// to confirmed.
    ///
    /// Acks for channels no longer desired are stale (an unsubscribe raced
    /// the ack) and are ignored. Returns true if the channel was confirmed.
    pub fn confirm(&mut self, channel: &str) -> bool {
        if !self.desired.contains(channel) {
            return false;
        }
        if self.pending.remove(channel) {
            self.confirmed.insert(channel.to_string());
            true
        } else {
            false
        }
    }

    /// Applies a failed subscribe ack: the request is no longer in flight,
    /// but the channel stays desired so the next replay retries it.
    ///
    /// Returns true if an in-flight request was cleared.
    pub fn reject(&mut self, channel: &str) -> bool {
        self.pending.remove(channel)
    }

    /// Clears per-connection state after the transport is lost.
    ///
    /// A dead transport has nothing pending and nothing confirmed; desired
    /// channels are kept for replay.
    pub fn reset_connection(&mut self) {
        self.pending.clear();
        self.confirmed.clear();
    }

    /// Starts a replay on a fresh connection: clears confirmed (the new
    /// transport has acked nothing), marks every desired channel pending,
    /// and returns the channels to re-send, sorted for determinism.
    pub fn begin_replay(&mut self) -> Vec<String> {
        self.confirmed.clear();
        self.pending = self.desired.clone();
        let mut channels: Vec<String> = self.desired.iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Returns true if the channel is desired.
    #[must_use]
    pub fn is_desired(&self, channel: &str) -> bool {
        self.desired.contains(channel)
    }

    /// Returns true if the channel is confirmed on the current connection.
    #[must_use]
    pub fn is_confirmed(&self, channel: &str) -> bool {
        self.confirmed.contains(channel)
    }

    /// Returns a sorted snapshot of all three sets.
    #[must_use]
    pub fn snapshot(&self) -> SubscriptionSnapshot {
        let mut desired: Vec<String> = self.desired.iter().cloned().collect();
        let mut pending: Vec<String> = self.pending.iter().cloned().collect();
        let mut confirmed: Vec<String> = self.confirmed.iter().cloned().collect();
        desired.sort();
        pending.sort();
        confirmed.sort();
        SubscriptionSnapshot {
            desired,
            pending,
            confirmed,
        }
    }
}
