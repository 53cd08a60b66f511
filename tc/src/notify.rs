//! Notifier - per-owner fan-out of task change events
//!
//! Each owner gets a tokio broadcast channel, created on first subscription.
//! Publishing is fire-and-forget: with no live subscribers the event is
//! dropped and the idle channel is pruned; a lagging subscriber loses the
//! oldest events without affecting anyone else.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::TaskChange;

/// Default per-owner channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
}

/// Event delivered to an owner's live observers: `{"type": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub data: Value,
}

impl Notification {
    pub fn new(kind: NotificationKind, data: Value) -> Self {
        Self { kind, data }
    }

    /// Event describing a committed task change
    pub fn for_change(change: &TaskChange) -> Self {
        let kind = match change {
            TaskChange::Created(_) => NotificationKind::TaskCreated,
            TaskChange::Updated(_) => NotificationKind::TaskUpdated,
            TaskChange::Deleted(_) => NotificationKind::TaskDeleted,
        };
        Self::new(kind, serde_json::to_value(change.task()).unwrap_or_default())
    }
}

/// Per-owner broadcast hub
pub struct Notifier {
    channels: Mutex<HashMap<String, broadcast::Sender<Notification>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "Notifier::new: called");
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Receive every event published for `owner` from now on
    pub fn subscribe(&self, owner: &str) -> broadcast::Receiver<Notification> {
        debug!(%owner, "Notifier::subscribe: new subscriber");
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(owner.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver an event to `owner`'s subscribers, returning how many got it
    pub fn publish(&self, owner: &str, notification: Notification) -> usize {
        debug!(%owner, kind = ?notification.kind, "Notifier::publish: called");
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = channels.get(owner) else {
            return 0;
        };
        match tx.send(notification) {
            Ok(delivered) => delivered,
            Err(_) => {
                debug!(%owner, "Notifier::publish: no live subscribers, pruning channel");
                channels.remove(owner);
                0
            }
        }
    }

    /// Publish one event per committed change, in order
    pub fn publish_changes(&self, owner: &str, changes: &[TaskChange]) {
        for change in changes {
            self.publish(owner, Notification::for_change(change));
        }
    }

    pub fn subscriber_count(&self, owner: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.get(owner).map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
