//! Content loading.
//!
//! Content is JSON text whose conditions and actions are tagged records
//! (`{ "id": <kind>, ...fields }`). Loading happens in two steps:
//!
//! 1. `serde` decodes the text into [`records`]. An unknown tag or a
//!    missing field fails here, naming the field and the owning event.
//! 2. [`Factory`] turns records into engine types, compiling every
//!    expression through one shared [`ExpressionCompiler`](crate::expr::ExpressionCompiler).
//!
//! ## Example Usage
//!
//! ```
//! use rust_rules::expr::ExpressionCompiler;
//! use rust_rules::loader::Factory;
//!
//! let mut compiler = ExpressionCompiler::new();
//! let event = Factory::new(&mut compiler)
//!     .event_json(r#"{
//!         "id": "sunrise",
//!         "trigger": "dawn",
//!         "actions": [{ "id": "UpdateVariable", "variable": "day", "value": "day + 1" }]
//!     }"#)
//!     .unwrap();
//!
//! assert_eq!(event.trigger.as_str(), "dawn");
//! assert_eq!(event.actions.len(), 1);
//! ```

mod factory;
pub mod records;

pub use factory::{Definitions, Factory};
pub use records::Content;
