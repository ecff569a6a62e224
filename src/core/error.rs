//! Error taxonomy for the engine.
//!
//! Every failure in this crate is fatal to the operation that raised it.
//! Errors fall into three families:
//!
//! - [`DefinitionError`]: malformed content (events, conditions, actions,
//!   expression source). Raised at load time.
//! - [`EvalError`]: content that loaded fine but cannot be evaluated
//!   (NaN results, references to ids that do not exist).
//! - [`UsageError`]: the host drove the engine incorrectly (reentrant
//!   passes, duplicate registrations, invalid choice indices).
//!
//! Nothing is retried. The host decides whether to restart the simulation.

use thiserror::Error;

/// Malformed content detected while loading or compiling.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("expression `{source_text}`: unexpected character(s) `{slice}` at {offset}")]
    Lex {
        source_text: String,
        slice: String,
        offset: usize,
    },

    #[error("expression `{source_text}`: {message}")]
    Syntax { source_text: String, message: String },

    #[error("expression `{source_text}`: unknown function `{function}`")]
    UnknownFunction { source_text: String, function: String },

    #[error("expression `{source_text}`: `{function}` expects {expected} argument(s), got {actual}")]
    Arity {
        source_text: String,
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: {source}")]
    Malformed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: field `{field}`: {source}")]
    Field {
        context: String,
        field: &'static str,
        #[source]
        source: Box<DefinitionError>,
    },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },
}

/// Content that cannot be evaluated against the current state.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("expression `{source_text}` evaluated to NaN")]
    NotANumber { source_text: String },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("unknown item `{0}`")]
    UnknownItem(String),

    #[error("unknown status `{0}`")]
    UnknownStatus(String),

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("host function `{function}`: {message}")]
    HostFunction { function: String, message: String },

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("random source produced {0}, expected a value in [0, 1)")]
    RandomOutOfRange(f64),

    #[error("invalid bounds for `{variable}`: [{min}, {max}]")]
    InvalidBounds { variable: String, min: f64, max: f64 },

    #[error("modifier amounts for `{0}` depend on their own target")]
    ModifierCycle(String),
}

/// The host drove the engine incorrectly.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("a trigger pass is already in flight")]
    PassInFlight,

    #[error("event `{0}` is already registered")]
    DuplicateEvent(String),

    #[error("`{kind}` `{id}` is already registered")]
    DuplicateDefinition { kind: &'static str, id: String },

    #[error("choice index {index} was not offered (offered: {offered:?})")]
    InvalidChoice { index: usize, offered: Vec<usize> },

    #[error("save state is incompatible: {0}")]
    IncompatibleSave(String),
}

/// Top-level error returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl EngineError {
    /// Returns a short name for the error family, used in logs.
    pub const fn family(&self) -> &'static str {
        match self {
            Self::Definition(_) => "definition",
            Self::Eval(_) => "evaluation",
            Self::Usage(_) => "usage",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names() {
        let err: EngineError = EvalError::UnknownVariable("x".into()).into();
        assert_eq!(err.family(), "evaluation");
        assert_eq!(err.to_string(), "unknown variable `x`");

        let err: EngineError = UsageError::PassInFlight.into();
        assert_eq!(err.family(), "usage");
    }

    #[test]
    fn test_field_error_names_context_and_field() {
        let inner = DefinitionError::UnknownFunction {
            source_text: "foo(1)".into(),
            function: "foo".into(),
        };
        let err = DefinitionError::Field {
            context: "event `intro`".into(),
            field: "probability",
            source: Box::new(inner),
        };
        let message = err.to_string();
        assert!(message.contains("intro"));
        assert!(message.contains("probability"));
        assert!(message.contains("foo"));
    }
}
