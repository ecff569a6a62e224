//! Expression compiler and cache.
//!
//! Source text is parsed once and translated into a tree of closures over a
//! [`FunctionTable`]. Results are cached by exact source text: compiling the
//! same string twice returns the same `Rc`.
//!
//! The cache key is the raw string, not the AST. `"a+1"` and `"a + 1"` are
//! compiled and cached separately.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{DefinitionError, EvalError};

use super::parser::{parse, BinaryOp, LogicalOp, Node, UnaryOp};

/// Host callbacks visible to compiled expressions.
pub trait FunctionTable {
    /// Resolve a bare name.
    fn variable(&self, name: &str) -> Result<f64, EvalError>;

    /// Invoke a registered host function.
    fn call(&self, function: &str, args: &[Arg<'_>]) -> Result<f64, EvalError>;
}

/// An argument passed to a host function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Arg<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> Arg<'a> {
    /// The argument as a number, if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Number(n) => Some(*n),
            Arg::Text(_) => None,
        }
    }

    /// The argument as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Arg::Text(s) => Some(s),
            Arg::Number(_) => None,
        }
    }
}

/// Truthiness shared by conditions and logical operators.
#[must_use]
pub fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Source of an expression: literal number or text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExprSource {
    Number(f64),
    Text(String),
}

impl From<f64> for ExprSource {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ExprSource {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ExprSource {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ExprSource {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for ExprSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

type EvalFn = Box<dyn Fn(&dyn FunctionTable) -> Result<f64, EvalError>>;

fn boxed<F>(f: F) -> EvalFn
where
    F: Fn(&dyn FunctionTable) -> Result<f64, EvalError> + 'static,
{
    Box::new(f)
}

enum ArgFn {
    Text(String),
    Number(EvalFn),
}

/// A compiled, immutable expression.
pub struct CompiledExpression {
    source: ExprSource,
    eval: EvalFn,
}

impl CompiledExpression {
    /// A constant expression.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            source: ExprSource::Number(value),
            eval: boxed(move |_| Ok(value)),
        }
    }

    /// The source this expression was compiled from.
    #[must_use]
    pub fn source(&self) -> &ExprSource {
        &self.source
    }

    /// Evaluate against a function table.
    ///
    /// A NaN result is an error: it always means broken content.
    pub fn eval(&self, table: &dyn FunctionTable) -> Result<f64, EvalError> {
        let value = (self.eval)(table)?;
        if value.is_nan() {
            return Err(EvalError::NotANumber {
                source_text: self.source.to_string(),
            });
        }
        Ok(value)
    }

    /// Evaluate and apply truthiness.
    pub fn eval_truthy(&self, table: &dyn FunctionTable) -> Result<bool, EvalError> {
        self.eval(table).map(truthy)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Argument count accepted by a function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    fn minimum(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::AtLeast(n) => n,
        }
    }
}

type Builtin = fn(&[f64]) -> f64;

/// Math helpers resolved at compile time.
const BUILTINS: &[(&str, Arity, Builtin)] = &[
    ("min", Arity::AtLeast(1), |a| a.iter().copied().fold(f64::INFINITY, f64::min)),
    ("max", Arity::AtLeast(1), |a| a.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
    ("abs", Arity::Exact(1), |a| a[0].abs()),
    ("floor", Arity::Exact(1), |a| a[0].floor()),
    ("ceil", Arity::Exact(1), |a| a[0].ceil()),
    // Rounds halves up: round(-2.5) == -2
    ("round", Arity::Exact(1), |a| (a[0] + 0.5).floor()),
    ("trunc", Arity::Exact(1), |a| a[0].trunc()),
    ("sign", Arity::Exact(1), |a| if a[0] == 0.0 { 0.0 } else { a[0].signum() }),
    ("sqrt", Arity::Exact(1), |a| a[0].sqrt()),
    ("pow", Arity::Exact(2), |a| a[0].powf(a[1])),
    ("log", Arity::Exact(1), |a| a[0].ln()),
    ("exp", Arity::Exact(1), |a| a[0].exp()),
    ("clamp", Arity::Exact(3), |a| a[0].max(a[1]).min(a[2])),
];

fn builtin(name: &str) -> Option<(Arity, Builtin)> {
    BUILTINS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, arity, f)| (*arity, *f))
}

/// Compiles expression source into [`CompiledExpression`]s and caches them.
///
/// ## Example
///
/// ```
/// use std::rc::Rc;
/// use rust_rules::expr::{Arg, ExpressionCompiler, FunctionTable};
/// use rust_rules::core::EvalError;
///
/// struct Vars;
/// impl FunctionTable for Vars {
///     fn variable(&self, name: &str) -> Result<f64, EvalError> {
///         match name {
///             "player.hope" => Ok(3.0),
///             _ => Err(EvalError::UnknownVariable(name.to_string())),
///         }
///     }
///     fn call(&self, function: &str, _: &[Arg<'_>]) -> Result<f64, EvalError> {
///         Err(EvalError::HostFunction { function: function.to_string(), message: "none".into() })
///     }
/// }
///
/// let mut compiler = ExpressionCompiler::new();
/// let expr = compiler.compile("max(player.hope, 5) * 2").unwrap();
/// assert_eq!(expr.eval(&Vars).unwrap(), 10.0);
///
/// let again = compiler.compile("max(player.hope, 5) * 2").unwrap();
/// assert!(Rc::ptr_eq(&expr, &again));
/// ```
#[derive(Default)]
pub struct ExpressionCompiler {
    host_functions: FxHashMap<String, Arity>,
    cache: FxHashMap<String, Rc<CompiledExpression>>,
}

impl ExpressionCompiler {
    /// Create a compiler that knows only the math builtins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function name callable from expressions.
    pub fn register_function(&mut self, name: impl Into<String>, arity: Arity) {
        self.host_functions.insert(name.into(), arity);
    }

    /// Register a host function (builder pattern).
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, arity: Arity) -> Self {
        self.register_function(name, arity);
        self
    }

    /// Whether `name` resolves to a builtin or host function.
    #[must_use]
    pub fn knows_function(&self, name: &str) -> bool {
        builtin(name).is_some() || self.host_functions.contains_key(name)
    }

    /// Number of cached text expressions.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Compile a source, returning the cached instance for repeated text.
    pub fn compile(
        &mut self,
        source: impl Into<ExprSource>,
    ) -> Result<Rc<CompiledExpression>, DefinitionError> {
        let text = match source.into() {
            ExprSource::Number(value) => return Ok(Rc::new(CompiledExpression::constant(value))),
            ExprSource::Text(text) => text,
        };

        if let Some(hit) = self.cache.get(&text) {
            return Ok(Rc::clone(hit));
        }

        let node = parse(&text)?;
        let eval = self.build(node, &text)?;
        let compiled = Rc::new(CompiledExpression {
            source: ExprSource::Text(text.clone()),
            eval,
        });
        self.cache.insert(text, Rc::clone(&compiled));
        Ok(compiled)
    }

    fn build(&self, node: Node, source: &str) -> Result<EvalFn, DefinitionError> {
        let eval = match node {
            Node::Number(value) => boxed(move |_| Ok(value)),
            Node::Text(_) => {
                return Err(DefinitionError::Syntax {
                    source_text: source.to_string(),
                    message: "string literals are only valid as function arguments".to_string(),
                })
            }
            Node::Variable(name) => boxed(move |table| table.variable(&name)),
            Node::Unary(op, operand) => {
                let operand = self.build(*operand, source)?;
                match op {
                    UnaryOp::Not => boxed(move |t| Ok(flag(!truthy(operand(t)?)))),
                    UnaryOp::Neg => boxed(move |t| Ok(-operand(t)?)),
                    UnaryOp::Plus => operand,
                }
            }
            Node::Binary(op, left, right) => {
                let left = self.build(*left, source)?;
                let right = self.build(*right, source)?;
                let apply: fn(f64, f64) -> f64 = match op {
                    BinaryOp::Add => |a, b| a + b,
                    BinaryOp::Sub => |a, b| a - b,
                    BinaryOp::Mul => |a, b| a * b,
                    BinaryOp::Div => |a, b| a / b,
                    BinaryOp::Rem => |a, b| a % b,
                    BinaryOp::Less => |a, b| flag(a < b),
                    BinaryOp::LessEq => |a, b| flag(a <= b),
                    BinaryOp::Greater => |a, b| flag(a > b),
                    BinaryOp::GreaterEq => |a, b| flag(a >= b),
                    BinaryOp::Eq => |a, b| flag(a == b),
                    BinaryOp::NotEq => |a, b| flag(a != b),
                    BinaryOp::And => |a, b| flag(truthy(a) && truthy(b)),
                    BinaryOp::Or => |a, b| flag(truthy(a) || truthy(b)),
                };
                boxed(move |t| Ok(apply(left(t)?, right(t)?)))
            }
            Node::Logical(op, left, right) => {
                let left = self.build(*left, source)?;
                let right = self.build(*right, source)?;
                match op {
                    LogicalOp::AndAnd => boxed(move |t| {
                        let l = left(t)?;
                        if truthy(l) {
                            right(t)
                        } else {
                            Ok(l)
                        }
                    }),
                    LogicalOp::OrOr => boxed(move |t| {
                        let l = left(t)?;
                        if truthy(l) {
                            Ok(l)
                        } else {
                            right(t)
                        }
                    }),
                }
            }
            Node::Ternary(condition, then, otherwise) => {
                let condition = self.build(*condition, source)?;
                let then = self.build(*then, source)?;
                let otherwise = self.build(*otherwise, source)?;
                boxed(move |t| {
                    if truthy(condition(t)?) {
                        then(t)
                    } else {
                        otherwise(t)
                    }
                })
            }
            Node::Call { name, args } => self.build_call(name, args, source)?,
        };
        Ok(eval)
    }

    fn build_call(
        &self,
        name: String,
        args: Vec<Node>,
        source: &str,
    ) -> Result<EvalFn, DefinitionError> {
        if let Some((arity, f)) = builtin(&name) {
            if !arity.accepts(args.len()) {
                return Err(arity_error(source, &name, arity, args.len()));
            }
            let args = args
                .into_iter()
                .map(|a| self.build(a, source))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(boxed(move |t| {
                let values = args
                    .iter()
                    .map(|a| a(t))
                    .collect::<Result<SmallVec<[f64; 4]>, _>>()?;
                Ok(f(&values))
            }));
        }

        let Some(arity) = self.host_functions.get(&name).copied() else {
            return Err(DefinitionError::UnknownFunction {
                source_text: source.to_string(),
                function: name,
            });
        };
        if !arity.accepts(args.len()) {
            return Err(arity_error(source, &name, arity, args.len()));
        }

        let args = args
            .into_iter()
            .map(|a| match a {
                Node::Text(text) => Ok(ArgFn::Text(text)),
                other => self.build(other, source).map(ArgFn::Number),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(boxed(move |t| {
            let mut values: SmallVec<[Arg<'_>; 4]> = SmallVec::with_capacity(args.len());
            for arg in &args {
                values.push(match arg {
                    ArgFn::Text(text) => Arg::Text(text),
                    ArgFn::Number(f) => Arg::Number(f(t)?),
                });
            }
            t.call(&name, &values)
        }))
    }
}

fn arity_error(source: &str, function: &str, arity: Arity, actual: usize) -> DefinitionError {
    DefinitionError::Arity {
        source_text: source.to_string(),
        function: function.to_string(),
        expected: arity.minimum(),
        actual,
    }
}

impl fmt::Debug for ExpressionCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionCompiler")
            .field("host_functions", &self.host_functions.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table;

    impl FunctionTable for Table {
        fn variable(&self, name: &str) -> Result<f64, EvalError> {
            match name {
                "a" => Ok(2.0),
                "b" => Ok(0.0),
                "player.hope" => Ok(7.0),
                _ => Err(EvalError::UnknownVariable(name.to_string())),
            }
        }

        fn call(&self, function: &str, args: &[Arg<'_>]) -> Result<f64, EvalError> {
            match (function, args) {
                ("item", [Arg::Text("rope")]) => Ok(3.0),
                ("item", [Arg::Text(_)]) => Ok(0.0),
                ("twice", [Arg::Number(n)]) => Ok(n * 2.0),
                _ => Err(EvalError::HostFunction {
                    function: function.to_string(),
                    message: "bad call".to_string(),
                }),
            }
        }
    }

    fn compiler() -> ExpressionCompiler {
        ExpressionCompiler::new()
            .with_function("item", Arity::Exact(1))
            .with_function("twice", Arity::Exact(1))
    }

    fn eval(source: &str) -> f64 {
        compiler().compile(source).unwrap().eval(&Table).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2+2"), 4.0);
        assert_eq!(eval("7 % 4 + 10 / 4"), 5.5);
        assert_eq!(eval("-a * 3"), -6.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("1/0"), f64::INFINITY);
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("a > 1"), 1.0);
        assert_eq!(eval("a <= 1"), 0.0);
        assert_eq!(eval("a === 2 && player.hope !== 3"), 1.0);
        assert_eq!(eval("b || 5"), 5.0);
        assert_eq!(eval("a && 5"), 5.0);
        assert_eq!(eval("b && unknown"), 0.0, "&& short-circuits");
        assert_eq!(eval("a || unknown"), 2.0, "|| short-circuits");
        assert_eq!(eval("a & b"), 0.0);
        assert_eq!(eval("a | b"), 1.0);
        assert_eq!(eval("!b"), 1.0);
    }

    #[test]
    fn test_single_operators_are_eager() {
        let expr = compiler().compile("a | unknown").unwrap();
        assert!(matches!(expr.eval(&Table), Err(EvalError::UnknownVariable(_))));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval("a > 1 ? 10 : 20"), 10.0);
        assert_eq!(eval("b ? 1 : b ? 2 : 3"), 3.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("max(1, a, player.hope)"), 7.0);
        assert_eq!(eval("min(4, a)"), 2.0);
        assert_eq!(eval("clamp(15, 0, 10)"), 10.0);
        assert_eq!(eval("round(2.5) + floor(1.9) + abs(-1)"), 5.0);
        assert_eq!(eval("item('rope') + item(\"lamp\")"), 3.0);
        assert_eq!(eval("twice(a + 1)"), 6.0);
    }

    #[test]
    fn test_unknown_function_fails_compilation() {
        let err = compiler().compile("nope(1)").unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownFunction { ref function, .. } if function == "nope"));
    }

    #[test]
    fn test_arity_checked_at_compile_time() {
        assert!(matches!(
            compiler().compile("pow(2)"),
            Err(DefinitionError::Arity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            compiler().compile("item()"),
            Err(DefinitionError::Arity { .. })
        ));
    }

    #[test]
    fn test_string_outside_call_rejected() {
        assert!(matches!(
            compiler().compile("'rope' + 1"),
            Err(DefinitionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_nan_fails_on_eval_not_compile() {
        let expr = compiler().compile("0/0").unwrap();
        assert!(matches!(expr.eval(&Table), Err(EvalError::NotANumber { .. })));

        let expr = compiler().compile("NaN").unwrap();
        assert!(expr.eval(&Table).is_err());
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let mut compiler = compiler();
        let first = compiler.compile("a + 1").unwrap();
        let second = compiler.compile("a + 1").unwrap();
        let spaced = compiler.compile("a+1").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &spaced));
        assert_eq!(compiler.cached(), 2);
    }

    #[test]
    fn test_numeric_source_is_constant() {
        let mut compiler = compiler();
        let expr = compiler.compile(2.5).unwrap();
        assert_eq!(expr.eval(&Table).unwrap(), 2.5);
        assert_eq!(expr.source(), &ExprSource::Number(2.5));
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn test_unknown_variable_is_eval_error() {
        let expr = compiler().compile("missing + 1").unwrap();
        assert!(matches!(expr.eval(&Table), Err(EvalError::UnknownVariable(_))));
    }

    #[test]
    fn test_expr_source_serde() {
        let n: ExprSource = serde_json::from_str("3").unwrap();
        assert_eq!(n, ExprSource::Number(3.0));
        let t: ExprSource = serde_json::from_str("\"a + 1\"").unwrap();
        assert_eq!(t, ExprSource::Text("a + 1".to_string()));
    }
}
