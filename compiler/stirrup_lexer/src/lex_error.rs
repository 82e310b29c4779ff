//! Lexer errors.

use stirrup_ir::Span;
use thiserror::Error;

/// Failure to recognize a token, or a malformed literal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at offset {}", span.start)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

impl LexError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        LexError {
            span,
            message: message.into(),
        }
    }

    /// The same error with its span moved by `offset` bytes.
    #[must_use]
    pub fn shifted(self, offset: u32) -> Self {
        LexError {
            span: self.span.shift(offset),
            message: self.message,
        }
    }
}
