//! Runtime errors.
//!
//! Every failure raised while a compiled expression runs is an
//! [`EvalError`]. Two kinds matter to callers:
//!
//! - [`EvalErrorKind::Halt`], raised by `☠`, escapes every isolation
//!   boundary and aborts the render.
//! - Everything else is a per-expression failure. `CompiledExpression::evaluate`
//!   routes it to the render context's error handler and yields null.
//!
//! Resolution misses are not errors at all; they evaluate to null.
//!
//! Construct errors through the factory functions below rather than by
//! building kinds inline, so messages stay uniform.

use stirrup_ir::{BinaryOp, Span, TemplateId, UnaryOp};
use thiserror::Error;

use crate::Value;

/// Result of evaluating an expression or a piece of one.
pub type EvalResult = Result<Value, EvalError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    /// `☠`: abort the entire render.
    #[error("rendering halted: {message}")]
    Halt { message: String },

    // === Operator errors ===
    #[error("operator '{op}' cannot be applied to {operand}")]
    InvalidOperand { op: &'static str, operand: String },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    InvalidOperands {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    #[error("cannot compare {left} with {right}")]
    Incomparable { left: String, right: String },

    // === Access errors ===
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("cannot index {receiver} with {index}")]
    CannotIndex { receiver: String, index: String },

    #[error("cannot access '{member}' on null")]
    NullReceiver { member: String },

    #[error("no template frame for binding {template:?}")]
    NoTemplateFrame { template: TemplateId },

    // === Call errors ===
    #[error("{method} expects {expected}, got {found}")]
    InvalidArgument {
        method: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("invalid regular expression: {message}")]
    InvalidRegex { message: String },

    #[error("maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize },

    /// Failure reported by host code.
    #[error("{message}")]
    Host { message: String },
}

/// A runtime error with an optional source location.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
}

impl EvalError {
    #[cold]
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        EvalError { kind, span: None }
    }

    /// Attach a span unless one is already set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    /// Whether this error must abort the render instead of being isolated.
    #[inline]
    pub fn is_halt(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Halt { .. })
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::from_kind(kind)
    }
}

#[cold]
pub fn halt(message: String) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Halt { message })
}

#[cold]
pub fn invalid_unary_operand(op: UnaryOp, operand: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperand {
        op: op.as_symbol(),
        operand: operand.type_name().into_owned(),
    })
}

#[cold]
pub fn invalid_binary_operands(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperands {
        op: op.as_symbol(),
        left: left.type_name().into_owned(),
        right: right.type_name().into_owned(),
    })
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow { operation })
}

#[cold]
pub fn incomparable(left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Incomparable {
        left: left.type_name().into_owned(),
        right: right.type_name().into_owned(),
    })
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, len })
}

#[cold]
pub fn cannot_index(receiver: &Value, index: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::CannotIndex {
        receiver: receiver.type_name().into_owned(),
        index: index.type_name().into_owned(),
    })
}

#[cold]
pub fn null_receiver(member: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NullReceiver {
        member: member.to_owned(),
    })
}

#[cold]
pub fn no_template_frame(template: TemplateId) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoTemplateFrame { template })
}

#[cold]
pub fn invalid_argument(method: &'static str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidArgument {
        method,
        expected,
        found: found.type_name().into_owned(),
    })
}

#[cold]
pub fn invalid_regex(error: &regex::Error) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidRegex {
        message: error.to_string(),
    })
}

#[cold]
pub fn recursion_limit(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { limit })
}

/// Error for host-provided methods to return.
#[cold]
pub fn host_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Host {
        message: message.into(),
    })
}
