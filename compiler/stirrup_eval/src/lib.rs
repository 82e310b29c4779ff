//! Stirrup Eval - runtime for compiled template expressions.
//!
//! [`ExpressionCompiler::compile`] parses a tag's text, lowers the IR to a
//! tree of closures (interned in an [`ExpressionCache`]) and returns a
//! [`CompiledExpression`]. Rendering evaluates it against a
//! [`RenderContext`], which carries all mutable per-render state.
//!
//! # Modules
//!
//! - `value`: runtime values and the single truthiness rule
//! - `operators`: coercion and semantics of every operator
//! - `identifier`: interned identifiers with per-shape resolver caches
//! - `host`: property providers for application types
//! - `streamable`: lazy single-pass sequences behind the streaming operators
//! - `context`: section stack, template bindings, annotations
//! - `error_handler`: where isolated failures are reported
//! - `lower`, `expression`, `cache`, `compiler`: compile and run
//!
//! # Failure model
//!
//! Misses (unknown names, absent members) are null, not errors. Operator
//! misuse is an [`EvalError`] isolated at [`CompiledExpression::evaluate`].
//! Only a halt (`☠`) escapes.

mod builtins;
mod cache;
mod compiler;
mod context;
mod error_handler;
pub mod errors;
mod expression;
mod host;
mod identifier;
mod lower;
mod operators;
mod streamable;
mod value;

pub use cache::ExpressionCache;
pub use compiler::{EvalArtifacts, ExpressionCompiler, TemplateParseState};
pub use context::{AnnotationHandler, RenderContext, ResultHook, SectionFrame, DEFAULT_MAX_CALL_DEPTH};
pub use error_handler::{
    buffer_handler, custom_handler, log_handler, silent_handler, BufferErrorHandler,
    ErrorCallback, ErrorHandler, ErrorReport, SharedErrorHandler,
};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use expression::CompiledExpression;
pub use host::{HostObject, HostType, TypeProvider};
pub use identifier::{Identifier, ResolverKind, Shape, ShapeKey};
pub use operators::{evaluate_binary, evaluate_unary, index, selects_right};
pub use streamable::Streamable;
pub use value::{RangeValue, Value};

pub use stirrup_ir::{Extensions, OutputMode, Span, TemplateId};
pub use stirrup_parse::{ParseError, ParseErrorKind};

#[cfg(test)]
mod tests;
