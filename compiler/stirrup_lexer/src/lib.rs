//! Stirrup Lexer - tokenizer for template expressions.
//!
//! The lexer is stateless: [`next_token`] takes the expression text, a byte
//! position and a [`LexMode`], and returns the single token found there. The
//! parser owns the mode:
//!
//! - [`LexMode::Operand`] where a value may start (literals, identifiers,
//!   prefix operators, container openers)
//! - [`LexMode::Operator`] after a complete operand (infix operators,
//!   closers, commas)
//! - [`LexMode::Member`] right after a navigation operator (identifier only)
//!
//! Each mode is a separate logos automaton, so the same characters can mean
//! different things depending on position: `..` is the parent-frame value
//! as an operand and the range operator after one; `-` is negation or
//! subtraction; `/name` is a root lookup or a division.
//!
//! Besides tokens, this crate provides the hand-written scanners the parser
//! needs for constructs that are recognized by shape rather than by token:
//! named-expression signatures, `name ->` lambda clauses, and string-literal
//! escapes and interpolation segments.

mod escape;
mod lex_error;
mod signature;
mod token;

pub use escape::{regex_pattern, split_interpolated, unescape, Segment};
pub use lex_error::LexError;
pub use signature::{scan_definition, scan_lambda_binding, Definition, LambdaBinding};
pub use token::{next_token, Ident, IdentKind, LexMode, Token, TokenKind};
