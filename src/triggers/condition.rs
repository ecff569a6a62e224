//! Event conditions.
//!
//! Conditions are stateless trees over compiled expressions. The same
//! instance can be checked from nested contexts (a loop body, a choice
//! requirement) without interference.

use std::rc::Rc;

use crate::core::EvalError;
use crate::expr::{CompiledExpression, FunctionTable};

/// A predicate checked against the engine's function table.
#[derive(Clone, Debug)]
pub enum Condition {
    /// True iff the expression is non-zero and not NaN.
    Expression(Rc<CompiledExpression>),

    /// Negation.
    Not(Box<Condition>),

    /// Every sub-condition holds. Stops at the first false one.
    All(Vec<Condition>),

    /// At least one sub-condition holds. Stops at the first true one.
    Any(Vec<Condition>),

    /// The number of true sub-conditions lies in `[min, max]`.
    ///
    /// Every sub-condition is checked. The bounds are re-evaluated on each
    /// check.
    Some {
        conditions: Vec<Condition>,
        min: Rc<CompiledExpression>,
        max: Rc<CompiledExpression>,
    },
}

impl Condition {
    /// Wrap an expression.
    #[must_use]
    pub fn expression(expression: Rc<CompiledExpression>) -> Self {
        Self::Expression(expression)
    }

    /// Negate a condition.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Check the condition.
    ///
    /// Evaluation errors propagate; nothing is defaulted.
    pub fn check(&self, table: &dyn FunctionTable) -> Result<bool, EvalError> {
        match self {
            Condition::Expression(expression) => expression.eval_truthy(table),

            Condition::Not(inner) => Ok(!inner.check(table)?),

            Condition::All(conditions) => all_hold(conditions, table),

            Condition::Any(conditions) => {
                for condition in conditions {
                    if condition.check(table)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Condition::Some {
                conditions,
                min,
                max,
            } => {
                let mut count = 0u32;
                for condition in conditions {
                    if condition.check(table)? {
                        count += 1;
                    }
                }
                let count = f64::from(count);
                Ok(count >= min.eval(table)? && count <= max.eval(table)?)
            }
        }
    }
}

/// True iff every condition holds, stopping at the first false one.
pub fn all_hold(conditions: &[Condition], table: &dyn FunctionTable) -> Result<bool, EvalError> {
    for condition in conditions {
        if !condition.check(table)? {
            return Ok(false);
        }
    }
    Ok(true)
}
