//! The expression language.
//!
//! A deliberately small grammar: arithmetic, comparisons, boolean logic,
//! ternaries, named variables and a closed set of functions. Content uses
//! it for amounts, weights, probabilities and requirements.
//!
//! - [`lexer`]: Logos tokenizer
//! - [`parser`]: recursive-descent parser to [`parser::Node`]
//! - [`ExpressionCompiler`]: closure compiler with a source-keyed cache
//! - [`FunctionTable`]: the host callbacks compiled expressions see

pub mod lexer;
pub mod parser;
mod compiler;

pub use compiler::{
    truthy, Arg, Arity, CompiledExpression, ExprSource, ExpressionCompiler, FunctionTable,
};
