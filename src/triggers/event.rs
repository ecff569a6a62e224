//! Event definitions.
//!
//! An event is a piece of content that listens on a trigger id. When the
//! trigger is processed, the event fires if it is enabled, not excluded,
//! its conditions hold and its probability gate passes.

use std::borrow::Borrow;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionList};
use crate::expr::CompiledExpression;

use super::condition::Condition;

/// Unique event identifier, authored in content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Create a new event ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EventId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trigger identifier. Any number of events can listen on one trigger.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub String);

impl TriggerId {
    /// Create a new trigger ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TriggerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TriggerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event definition.
///
/// Immutable once registered. The enabled flag and occurrence counter are
/// runtime state held by the [`EventRegistry`](super::EventRegistry).
#[derive(Clone, Debug)]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,

    /// Trigger this event listens on.
    pub trigger: TriggerId,

    /// All must hold for the event to fire.
    pub conditions: Vec<Condition>,

    /// Run when the event fires.
    pub actions: ActionList,

    /// Firing probability, evaluated when the event is considered.
    pub probability: Rc<CompiledExpression>,

    /// Events barred from firing for the rest of the pass once this fires.
    pub exclusions: Vec<EventId>,

    /// Disable after firing until the next reset.
    pub once: bool,

    /// Initial value of the disabled flag.
    pub disabled_by_default: bool,
}

impl Event {
    /// Create an event that always fires on `trigger`.
    pub fn new(id: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            id: EventId::new(id),
            trigger: TriggerId::new(trigger),
            conditions: Vec::new(),
            actions: ActionList::default(),
            probability: Rc::new(CompiledExpression::constant(1.0)),
            exclusions: Vec::new(),
            once: false,
            disabled_by_default: false,
        }
    }

    /// Add a condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an action (builder pattern).
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Replace the action list (builder pattern).
    #[must_use]
    pub fn with_actions(mut self, actions: ActionList) -> Self {
        self.actions = actions;
        self
    }

    /// Set the firing probability (builder pattern).
    #[must_use]
    pub fn with_probability(mut self, probability: Rc<CompiledExpression>) -> Self {
        self.probability = probability;
        self
    }

    /// Exclude another event for the rest of the pass (builder pattern).
    #[must_use]
    pub fn excluding(mut self, event: impl Into<String>) -> Self {
        self.exclusions.push(EventId::new(event));
        self
    }

    /// Fire at most once per reset (builder pattern).
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Start disabled (builder pattern).
    #[must_use]
    pub fn disabled_by_default(mut self) -> Self {
        self.disabled_by_default = true;
        self
    }
}
