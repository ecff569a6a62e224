//! Event registry and trigger scheduling primitives.
//!
//! Content groups events under trigger ids. The host (or an action) enqueues
//! a trigger; the engine later pops it and tries every event registered
//! under that id, in registration order.
//!
//! ## Key Components
//!
//! - [`EventId`] / [`TriggerId`]: string identifiers authored in content
//! - [`Event`]: a complete event definition
//! - [`Condition`]: predicates over the engine's function table
//! - [`EventRegistry`]: storage, trigger index and runtime flags
//! - [`TriggerQueue`]: pending triggers ordered by priority then insertion
//!
//! ## Example Usage
//!
//! ```
//! use rust_rules::triggers::{Event, EventRegistry, TriggerQueue};
//!
//! let mut registry = EventRegistry::new();
//! registry.register(Event::new("sunrise", "dawn")).unwrap();
//! registry.register(Event::new("rooster", "dawn").once()).unwrap();
//!
//! let mut queue = TriggerQueue::new();
//! queue.push("dawn".into(), 0, 1.0);
//!
//! let pending = queue.pop().unwrap();
//! let ids: Vec<_> = registry
//!     .listeners(pending.trigger.as_str())
//!     .map(|event| event.id.as_str())
//!     .collect();
//! assert_eq!(ids, ["sunrise", "rooster"]);
//! ```

mod condition;
mod event;
mod queue;
mod registry;

pub use condition::{all_hold, Condition};
pub use event::{Event, EventId, TriggerId};
pub use queue::{PendingTrigger, TriggerQueue};
pub use registry::{EventFlags, EventRegistry};
