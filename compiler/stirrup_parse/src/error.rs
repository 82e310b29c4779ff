//! Parse error types.
//!
//! Every compile-time failure is a [`ParseError`]: a structured
//! [`ParseErrorKind`] plus the absolute byte span it refers to. Errors are
//! fatal to the surrounding template load; nothing is partially compiled.

use stirrup_ir::{OperandType, Span};
use stirrup_lexer::LexError;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    // === Token-level errors ===
    /// The lexer could not recognize a token.
    #[error("{0}")]
    Lex(String),

    /// A token that cannot appear here.
    #[error("unexpected '{found}', expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
    },

    /// Input ended while an operand or operator was still missing.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Nothing to evaluate.
    #[error("unexpected empty expression")]
    EmptyExpression,

    // === Structure errors ===
    /// An opener whose closer never came, or was the wrong one.
    #[error("unmatched '{opener}'")]
    UnmatchedOpener { opener: &'static str },

    /// A closer with no opener.
    #[error("unexpected '{closer}' without a matching opener")]
    UnexpectedCloser { closer: String },

    /// `?` without its `:`.
    #[error("unmatched '?' in ternary expression")]
    UnmatchedTernary,

    /// Trailing comma where only call and container syntax allow it.
    #[error("trailing ',' is not allowed here")]
    TrailingComma,

    /// `,` with nothing before it.
    #[error("missing element before ','")]
    MissingElement,

    /// Container needs a different number of elements.
    #[error("'{opener}' expects exactly one element")]
    ElementCount { opener: &'static str },

    /// Pairs and plain values in the same container literal.
    #[error("cannot mix 'key: value' pairs and plain values in one container")]
    MixedContainer,

    /// `key: value` outside a `[` or `{` container.
    #[error("'key: value' pair is only allowed inside '[...]' or '{{...}}'")]
    PairOutsideContainer,

    // === Semantic errors ===
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("duplicate parameter '{name}'")]
    DuplicateParameter { name: String },

    #[error("named expression '{name}' is already defined")]
    DuplicateDefinition { name: String },

    /// An operand statically known to be the wrong shape for the operator.
    #[error("operator '{op}' cannot be applied to a {operand} operand")]
    InvalidOperand {
        op: &'static str,
        operand: OperandType,
    },

    #[error("unknown internal name '.{name}'")]
    UnknownInternalName { name: String },

    /// Syntax belonging to a disabled extension.
    #[error("{feature} are not enabled")]
    ExtensionDisabled { feature: &'static str },

    /// A literal that lexed but cannot be built, such as a bad regex.
    #[error("invalid literal: {message}")]
    InvalidLiteral { message: String },
}

impl ParseErrorKind {
    /// Short headline for error reports.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Lex(_) => "UNRECOGNIZED TOKEN",
            Self::UnexpectedToken { .. } => "UNEXPECTED TOKEN",
            Self::UnexpectedEnd | Self::EmptyExpression => "INCOMPLETE EXPRESSION",
            Self::UnmatchedOpener { .. }
            | Self::UnexpectedCloser { .. }
            | Self::UnmatchedTernary => "UNBALANCED EXPRESSION",
            Self::TrailingComma
            | Self::MissingElement
            | Self::ElementCount { .. }
            | Self::MixedContainer
            | Self::PairOutsideContainer => "INVALID CONTAINER",
            Self::InvalidAssignmentTarget => "INVALID ASSIGNMENT",
            Self::DuplicateParameter { .. } | Self::DuplicateDefinition { .. } => "DUPLICATE NAME",
            Self::InvalidOperand { .. } => "TYPE MISMATCH",
            Self::UnknownInternalName { .. } => "UNKNOWN NAME",
            Self::ExtensionDisabled { .. } => "DISABLED FEATURE",
            Self::InvalidLiteral { .. } => "INVALID LITERAL",
        }
    }
}

/// A compile-time error with its location in the template.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} (at {span})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    /// Convert a lexer error whose span is relative to text at `base`.
    pub fn from_lex(error: LexError, base: u32) -> Self {
        let error = error.shifted(base);
        ParseError {
            kind: ParseErrorKind::Lex(error.message),
            span: error.span,
        }
    }
}
