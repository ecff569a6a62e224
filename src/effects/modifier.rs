//! Modifiers and the combination algebra.
//!
//! Every stacked provider contributes its modifiers for a target id. The
//! contributions are folded into [`CombinedModifiers`], which is then
//! applied in a fixed order:
//!
//! ```text
//! value = base * (1 + Σ relativeToBase)
//! value = value + Σ absolute
//! value = value * Π (1 + relative)^count
//! value = clamp(value, min, max)
//! ```
//!
//! An Assignment modifier short-circuits everything: the first one met in
//! iteration order is the result.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::EvalError;
use crate::expr::{CompiledExpression, FunctionTable};

use super::attribute::Attribute;
use super::provider::EffectProvider;

/// How a modifier's amount combines with others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Added after the base term, scaled by stack count.
    Absolute,
    /// Multiplies the running value by `(1 + amount)` per stacked provider.
    Relative,
    /// Scales the base, summed across providers.
    RelativeToBase,
    /// Replaces the result outright.
    Assignment,
}

/// A single modifier owned by an effect provider.
#[derive(Clone, Debug)]
pub struct Modifier {
    /// Attribute or effect id this modifier targets.
    pub target: String,
    pub kind: ModifierKind,
    /// Evaluated whenever the modified value is computed.
    pub amount: Rc<CompiledExpression>,
}

impl Modifier {
    /// Create a modifier.
    pub fn new(target: impl Into<String>, kind: ModifierKind, amount: Rc<CompiledExpression>) -> Self {
        Self {
            target: target.into(),
            kind,
            amount,
        }
    }

    /// Create a modifier with a constant amount.
    pub fn constant(target: impl Into<String>, kind: ModifierKind, amount: f64) -> Self {
        Self::new(target, kind, Rc::new(CompiledExpression::constant(amount)))
    }
}

/// Aggregated modifier amounts for one target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombinedModifiers {
    /// Σ amount × count.
    pub absolute: f64,
    /// Π (1 + amount)^count. Starts at 1.
    pub relative: f64,
    /// Σ amount × count.
    pub relative_to_base: f64,
    /// First assignment met, if any.
    pub assignment: Option<f64>,
}

impl Default for CombinedModifiers {
    fn default() -> Self {
        Self {
            absolute: 0.0,
            relative: 1.0,
            relative_to_base: 0.0,
            assignment: None,
        }
    }
}

impl CombinedModifiers {
    /// Create an empty combination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one modifier amount contributed by a stack of `count` providers.
    ///
    /// Once an assignment is recorded, later assignments are ignored.
    pub fn add(&mut self, kind: ModifierKind, amount: f64, count: u32) {
        let n = f64::from(count);
        match kind {
            ModifierKind::Absolute => self.absolute += amount * n,
            ModifierKind::RelativeToBase => self.relative_to_base += amount * n,
            ModifierKind::Relative => {
                self.relative *= (1.0 + amount).powi(count.min(i32::MAX as u32) as i32);
            }
            ModifierKind::Assignment => {
                if self.assignment.is_none() {
                    self.assignment = Some(amount);
                }
            }
        }
    }

    /// Add a modifier (builder pattern).
    #[must_use]
    pub fn with(mut self, kind: ModifierKind, amount: f64, count: u32) -> Self {
        self.add(kind, amount, count);
        self
    }

    /// Apply to a bounded attribute.
    ///
    /// Assignments are returned as-is, without clamping.
    #[must_use]
    pub fn apply(&self, attribute: &Attribute) -> f64 {
        if let Some(assigned) = self.assignment {
            return assigned;
        }
        let mut value = attribute.base * (1.0 + self.relative_to_base);
        value += self.absolute;
        value *= self.relative;
        value.clamp(attribute.min, attribute.max)
    }

    /// Value of a plain effect id: `Σ absolute × Π relative`, no base term.
    #[must_use]
    pub fn effect_value(&self) -> f64 {
        self.assignment.unwrap_or(self.absolute * self.relative)
    }

    /// Combine every modifier targeting `target` across stacked providers.
    ///
    /// Sources are visited in order; evaluation stops at the first
    /// Assignment so later amounts are never evaluated.
    pub fn collect<'a>(
        sources: impl IntoIterator<Item = (&'a EffectProvider, u32)>,
        target: &str,
        table: &dyn FunctionTable,
    ) -> Result<Self, EvalError> {
        let mut combined = Self::new();
        for (provider, count) in sources {
            if count == 0 {
                continue;
            }
            for modifier in provider.modifiers_for(target) {
                let amount = modifier.amount.eval(table)?;
                combined.add(modifier.kind, amount, count);
                if combined.assignment.is_some() {
                    return Ok(combined);
                }
            }
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute() -> Attribute {
        Attribute::new("strength", 100.0, 0.0, 200.0)
    }

    #[test]
    fn test_application_order() {
        let combined = CombinedModifiers::new()
            .with(ModifierKind::Absolute, 10.0, 1)
            .with(ModifierKind::RelativeToBase, 0.1, 1)
            .with(ModifierKind::Relative, 0.2, 1);

        let expected = ((100.0 * 1.1) + 10.0) * 1.2;
        assert!((combined.apply(&attribute()) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_relative_stacks_multiplicatively() {
        let combined = CombinedModifiers::new().with(ModifierKind::Relative, 0.5, 3);
        assert_eq!(combined.relative, 3.375);
    }

    #[test]
    fn test_absolute_scales_with_count() {
        let combined = CombinedModifiers::new().with(ModifierKind::Absolute, 4.0, 3);
        assert_eq!(combined.apply(&attribute()), 112.0);
    }

    #[test]
    fn test_clamped_to_bounds() {
        let combined = CombinedModifiers::new().with(ModifierKind::Relative, 2.0, 1);
        assert_eq!(combined.apply(&attribute()), 200.0);

        let combined = CombinedModifiers::new().with(ModifierKind::Absolute, -500.0, 1);
        assert_eq!(combined.apply(&attribute()), 0.0);
    }

    #[test]
    fn test_assignment_short_circuits() {
        let combined = CombinedModifiers::new()
            .with(ModifierKind::Absolute, 10.0, 1)
            .with(ModifierKind::Assignment, 7.0, 1)
            .with(ModifierKind::Relative, 3.0, 2);

        assert_eq!(combined.apply(&attribute()), 7.0);
        assert_eq!(combined.effect_value(), 7.0);
    }

    #[test]
    fn test_first_assignment_wins() {
        let combined = CombinedModifiers::new()
            .with(ModifierKind::Assignment, 1.0, 1)
            .with(ModifierKind::Assignment, 2.0, 1);
        assert_eq!(combined.assignment, Some(1.0));
    }

    #[test]
    fn test_effect_value_has_no_base() {
        let combined = CombinedModifiers::new()
            .with(ModifierKind::Absolute, 2.0, 2)
            .with(ModifierKind::Relative, 0.5, 1);
        assert_eq!(combined.effect_value(), 6.0);
        assert_eq!(CombinedModifiers::new().effect_value(), 0.0);
    }
}
