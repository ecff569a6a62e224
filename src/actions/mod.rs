//! Action trees.
//!
//! Actions are the side-effecting half of content: they show text, ask for
//! choices, mutate variables, items and statuses, branch, loop, roll dice and
//! enqueue further triggers.
//!
//! - [`Action`]: the closed set of action kinds
//! - [`ActionList`]: sequential execution with a three-way [`Flow`]
//! - [`UiProxy`]: the asynchronous user-facing collaborator
//!
//! Execution is `async` and single-threaded. A pass suspends only while the
//! [`UiProxy`] resolves a message or a choice.

mod action;
mod execute;
mod ui;

pub use action::{
    Action, ActionList, Branch, Choice, Flow, ItemAmount, LoopSpec, TriggerRequest,
    VariableUpdate, WeightedGroup,
};
pub use ui::{ChoiceOption, ChoicePrompt, HeadlessUi, Message, UiProxy};
