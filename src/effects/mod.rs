//! Effects: derived numbers from stacked providers.
//!
//! Items and statuses are [`EffectProvider`]s. Each carries modifiers that
//! target an attribute or an effect id. The engine combines the modifiers
//! of every held provider into [`CombinedModifiers`] whenever an attribute
//! or effect value is read.
//!
//! ## Key Components
//!
//! - [`Attribute`] / [`AttributeRegistry`]: base value and bounds
//! - [`Modifier`] / [`ModifierKind`]: one contribution to a target
//! - [`Inventory`]: item stacks with caps
//! - [`StatusTable`]: statuses with remaining durations
//!
//! ## Example Usage
//!
//! ```
//! use rust_rules::effects::{Attribute, CombinedModifiers, ModifierKind};
//!
//! let strength = Attribute::new("strength", 10.0, 0.0, 100.0);
//! let combined = CombinedModifiers::new()
//!     .with(ModifierKind::Absolute, 2.0, 3)
//!     .with(ModifierKind::Relative, 0.5, 1);
//!
//! assert_eq!(combined.apply(&strength), 24.0);
//! ```

mod attribute;
mod collection;
mod modifier;
mod provider;

pub use attribute::{Attribute, AttributeRegistry};
pub use collection::{Inventory, Stack, StatusEntry, StatusTable};
pub use modifier::{CombinedModifiers, Modifier, ModifierKind};
pub use provider::{EffectProvider, ProviderCatalog};
