//! Action definitions.
//!
//! Actions are a closed sum type. The data is authored in content; the kind
//! set is fixed. Execution lives in `execute.rs`.

use std::rc::Rc;

use crate::expr::CompiledExpression;
use crate::triggers::{Condition, EventId, TriggerId};

use super::ui::Message;

/// Control-flow result of running an action or a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Stop the current list. The caller sees `Continue`.
    StopLocal,
    /// Stop every enclosing list of the event.
    StopGlobal,
}

/// Ordered actions run in sequence.
#[derive(Clone, Debug, Default)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Append an action (builder pattern).
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl From<Vec<Action>> for ActionList {
    fn from(actions: Vec<Action>) -> Self {
        Self::new(actions)
    }
}

impl FromIterator<Action> for ActionList {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One option of [`Action::DisplayChoices`].
#[derive(Clone, Debug)]
pub struct Choice {
    pub text: String,
    /// Offered only if this holds. `None` means always offered.
    pub requirement: Option<Condition>,
    pub actions: ActionList,
}

/// One group of [`Action::Random`].
#[derive(Clone, Debug)]
pub struct WeightedGroup {
    pub weight: Rc<CompiledExpression>,
    pub actions: ActionList,
}

/// One branch of [`Action::Switch`].
#[derive(Clone, Debug)]
pub struct Branch {
    pub condition: Condition,
    pub actions: ActionList,
}

/// Body and termination of [`Action::Loop`].
#[derive(Clone, Debug)]
pub struct LoopSpec {
    pub actions: ActionList,
    pub stop: Option<Condition>,
    /// Zero means unbounded.
    pub max_iterations: u32,
    /// Check `stop` after each iteration (do-while) instead of before.
    pub check_stop_at_end: bool,
}

/// One assignment of [`Action::UpdateVariables`].
#[derive(Clone, Debug)]
pub struct VariableUpdate {
    pub variable: String,
    pub value: Rc<CompiledExpression>,
}

/// One entry of [`Action::UpdateItemAmounts`].
#[derive(Clone, Debug)]
pub struct ItemAmount {
    pub item: String,
    pub amount: Rc<CompiledExpression>,
}

/// One trigger of [`Action::TriggerEvents`].
#[derive(Clone, Debug)]
pub struct TriggerRequest {
    pub trigger: TriggerId,
    /// Falls back to the configured default priority.
    pub priority: Option<i32>,
    /// Evaluated when enqueued, gated when popped.
    pub probability: Rc<CompiledExpression>,
}

/// An action.
#[derive(Clone, Debug)]
pub enum Action {
    // === Presentation ===

    /// Show a message and wait for acknowledgement.
    DisplayMessage(Message),

    /// Show one of several messages, picked uniformly.
    DisplayRandomMessage {
        messages: Vec<String>,
        confirm: Option<String>,
        icon: Option<String>,
    },

    /// Offer the choices whose requirement holds, then run the chosen one.
    DisplayChoices {
        message: String,
        icon: Option<String>,
        choices: Vec<Choice>,
    },

    // === Control flow ===

    /// Run exactly one group, picked by weight.
    Random { groups: Vec<WeightedGroup> },

    /// Run `success` with the given probability, `fail` otherwise.
    CoinFlip {
        probability: Rc<CompiledExpression>,
        success: ActionList,
        fail: ActionList,
    },

    /// Run the first branch whose condition holds.
    Switch { branches: Vec<Branch> },

    /// Repeat a body.
    Loop(LoopSpec),

    /// End the current list, or every enclosing list if `global`.
    Stop { global: bool },

    /// Set the end state and stop the event.
    EndGame { outcome: Option<String> },

    // === State ===

    /// Set a variable (clamped to its bounds).
    UpdateVariable {
        variable: String,
        value: Rc<CompiledExpression>,
    },

    /// Evaluate every value, then assign them in order.
    UpdateVariables { updates: Vec<VariableUpdate> },

    /// Replace a variable's bounds. `None` keeps the current bound.
    UpdateVariableLimits {
        variable: String,
        min: Option<Rc<CompiledExpression>>,
        max: Option<Rc<CompiledExpression>>,
    },

    /// Give an item. A negative amount removes.
    GiveItem {
        item: String,
        amount: Rc<CompiledExpression>,
    },

    /// [`Action::GiveItem`] for several items.
    UpdateItemAmounts { items: Vec<ItemAmount> },

    /// Apply a status for `duration` ticks. Zero removes, infinity is
    /// permanent.
    SetStatus {
        status: String,
        duration: Rc<CompiledExpression>,
    },

    // === Scheduling ===

    /// Enqueue triggers. Nothing runs recursively.
    TriggerEvents { triggers: Vec<TriggerRequest> },

    EnableEvents { events: Vec<EventId> },

    DisableEvents { events: Vec<EventId> },
}

impl Action {
    /// The content tag of this action kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Action::DisplayMessage(_) => "DisplayMessage",
            Action::DisplayRandomMessage { .. } => "DisplayRandomMessage",
            Action::DisplayChoices { .. } => "DisplayChoices",
            Action::Random { .. } => "Random",
            Action::CoinFlip { .. } => "CoinFlip",
            Action::Switch { .. } => "Switch",
            Action::Loop(_) => "Loop",
            Action::Stop { .. } => "Stop",
            Action::EndGame { .. } => "EndGame",
            Action::UpdateVariable { .. } => "UpdateVariable",
            Action::UpdateVariables { .. } => "UpdateVariables",
            Action::UpdateVariableLimits { .. } => "UpdateVariableLimits",
            Action::GiveItem { .. } => "GiveItem",
            Action::UpdateItemAmounts { .. } => "UpdateItemAmounts",
            Action::SetStatus { .. } => "SetStatus",
            Action::TriggerEvents { .. } => "TriggerEvents",
            Action::EnableEvents { .. } => "EnableEvents",
            Action::DisableEvents { .. } => "DisableEvents",
        }
    }

    /// Show a message.
    pub fn message(text: impl Into<String>) -> Self {
        Action::DisplayMessage(Message::new(text))
    }

    /// Set a variable to an expression.
    pub fn set(variable: impl Into<String>, value: Rc<CompiledExpression>) -> Self {
        Action::UpdateVariable {
            variable: variable.into(),
            value,
        }
    }

    /// Give a constant number of items.
    pub fn give(item: impl Into<String>, amount: f64) -> Self {
        Action::GiveItem {
            item: item.into(),
            amount: Rc::new(CompiledExpression::constant(amount)),
        }
    }

    /// Enqueue one trigger with the default priority and no gate.
    pub fn trigger(trigger: impl Into<String>) -> Self {
        Action::TriggerEvents {
            triggers: vec![TriggerRequest {
                trigger: TriggerId::new(trigger),
                priority: None,
                probability: Rc::new(CompiledExpression::constant(1.0)),
            }],
        }
    }

    /// Stop the current list.
    pub const fn stop() -> Self {
        Action::Stop { global: false }
    }

    /// Stop every enclosing list.
    pub const fn stop_global() -> Self {
        Action::Stop { global: true }
    }
}
