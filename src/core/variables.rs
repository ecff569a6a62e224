//! Bounded numeric variable store.
//!
//! Variables are declared up front with an initial value and optional
//! inclusive bounds. Every write is clamped to the bounds. Reading or
//! writing an undeclared variable is an evaluation error; content that
//! references a variable the host never declared is an authoring bug.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::EvalError;
use super::number::PersistedNumber;

/// A single variable: current value plus inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Variable {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl Variable {
    /// An unbounded variable.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// A variable with inclusive bounds. The value is clamped immediately.
    ///
    /// # Panics
    ///
    /// Panics if the bounds fail [`valid_bounds`].
    #[must_use]
    pub fn bounded(value: f64, min: f64, max: f64) -> Self {
        Self {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    /// Whether the bounds are the unbounded default.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }
}

/// Whether `[min, max]` is a usable inclusive range.
///
/// NaN bounds compare false, so they are rejected along with `min > max`.
#[must_use]
pub fn valid_bounds(min: f64, max: f64) -> bool {
    min <= max
}

/// Persisted form of a variable: a bare value, or `[value, lower, upper]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedVariable {
    Value(PersistedNumber),
    Bounded(PersistedNumber, PersistedNumber, PersistedNumber),
}

impl From<Variable> for PersistedVariable {
    fn from(var: Variable) -> Self {
        if var.is_unbounded() {
            Self::Value(var.value.into())
        } else {
            Self::Bounded(var.value.into(), var.min.into(), var.max.into())
        }
    }
}

impl From<PersistedVariable> for Variable {
    fn from(var: PersistedVariable) -> Self {
        match var {
            PersistedVariable::Value(value) => Variable::new(value.get()),
            PersistedVariable::Bounded(value, min, max) => Variable {
                value: value.get(),
                min: min.get(),
                max: max.get(),
            },
        }
    }
}

/// Store of declared variables.
#[derive(Clone, Debug, Default)]
pub struct VariableStore {
    vars: FxHashMap<String, Variable>,
}

impl VariableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a variable.
    pub fn define(&mut self, id: impl Into<String>, var: Variable) {
        self.vars.insert(id.into(), var);
    }

    /// Check whether a variable is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.vars.contains_key(id)
    }

    /// Look up a declared variable.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.vars.get(id)
    }

    /// Current value of a declared variable.
    pub fn value(&self, id: &str) -> Result<f64, EvalError> {
        self.vars
            .get(id)
            .map(|v| v.value)
            .ok_or_else(|| EvalError::UnknownVariable(id.to_string()))
    }

    /// Set a declared variable, clamped to its bounds.
    ///
    /// Returns `(old, new)` values.
    pub fn set(&mut self, id: &str, value: f64) -> Result<(f64, f64), EvalError> {
        let var = self
            .vars
            .get_mut(id)
            .ok_or_else(|| EvalError::UnknownVariable(id.to_string()))?;
        let old = var.value;
        var.value = value.clamp(var.min, var.max);
        Ok((old, var.value))
    }

    /// Replace the bounds of a declared variable and re-clamp its value.
    ///
    /// `None` keeps the existing bound. Returns `(old, new)` values.
    pub fn set_bounds(
        &mut self,
        id: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(f64, f64), EvalError> {
        let var = self
            .vars
            .get_mut(id)
            .ok_or_else(|| EvalError::UnknownVariable(id.to_string()))?;
        let min = min.unwrap_or(var.min);
        let max = max.unwrap_or(var.max);
        if !valid_bounds(min, max) {
            return Err(EvalError::InvalidBounds {
                variable: id.to_string(),
                min,
                max,
            });
        }
        let old = var.value;
        var.min = min;
        var.max = max;
        var.value = var.value.clamp(min, max);
        Ok((old, var.value))
    }

    /// Iterate over all variables, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if no variables are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
