//! Post-mutation change notifications.
//!
//! Mutations record a [`Notification`] instead of calling back into the
//! host. The host drains the queue from its own main loop after the call
//! that caused the change has returned.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Something observable changed inside the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// A variable value changed.
    VariableChanged { id: String, old: f64, new: f64 },

    /// A variable's bounds changed.
    VariableLimitsChanged { id: String, min: f64, max: f64 },

    /// An inventory stack count changed.
    ItemChanged { id: String, old: u32, new: u32 },

    /// A status was applied, refreshed, or expired.
    StatusChanged { id: String, remaining: Option<f64> },

    /// An event fired during a pass.
    EventFired { event: String, trigger: String },

    /// An event's enabled flag changed.
    EventToggled { event: String, enabled: bool },

    /// The game reached its end state.
    GameEnded { outcome: Option<String> },
}

/// FIFO of pending notifications.
#[derive(Clone, Debug, Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notification.
    pub fn push(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    /// Number of pending notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
