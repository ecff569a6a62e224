//! # rust-rules
//!
//! A data-driven rule and event engine for turn-based simulations.
//!
//! Content authored outside the host (events, conditions, actions and
//! numeric expressions) drives state changes and user-facing prompts without
//! recompiling anything.
//!
//! ## Design Principles
//!
//! 1. **Content Is Data**: The kinds of conditions and actions are a closed
//!    set; only their data comes from content.
//!
//! 2. **Deterministic**: One seeded random source, one trigger queue with a
//!    total order. The same content, seed and inputs replay identically.
//!
//! 3. **Fail Loudly**: Malformed content, unknown ids and NaN results are
//!    errors. Nothing is silently defaulted.
//!
//! ## Architecture
//!
//! - **Compiled Expressions**: Expression text is compiled once to a
//!   closure tree and cached by source text.
//!
//! - **Single-Threaded Async**: Action execution suspends only while the
//!   [`UiProxy`](actions::UiProxy) resolves a message or a choice.
//!
//! ## Modules
//!
//! - `core`: Errors, RNG, variables, notifications, configuration
//! - `expr`: Expression lexer, parser and compiler
//! - `effects`: Attributes, modifiers, inventory and statuses
//! - `triggers`: Events, conditions, registry and trigger queue
//! - `actions`: Action trees and the UI proxy
//! - `engine`: Engine state, scheduler and save/restore
//! - `loader`: Tagged-record content factories

pub mod actions;
pub mod core;
pub mod effects;
pub mod engine;
pub mod expr;
pub mod loader;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{
    DefinitionError, EngineConfig, EngineError, EvalError, GameRng, Notification, RandomSource,
    Result, UsageError, Variable,
};

pub use crate::expr::{CompiledExpression, ExprSource, ExpressionCompiler, FunctionTable};

pub use crate::effects::{Attribute, EffectProvider, Modifier, ModifierKind};

pub use crate::triggers::{Condition, Event, EventId, TriggerId};

pub use crate::actions::{Action, ActionList, Flow, HeadlessUi, Message, UiProxy};

pub use crate::engine::{Engine, EngineState, PassReport, SaveState};
