//! Stirrup Parse - expression compiler for template tags.
//!
//! [`parse`] turns the text of one tag into a [`Parsed`] expression: a
//! hashable [`Node`](stirrup_ir::Node) tree plus the identifier and
//! named-expression tables it indexes. The tree is built by a shunting-yard
//! pass over tokens from `stirrup_lexer`, driven entirely by the operator
//! table in `stirrup_ir`.
//!
//! A [`ParseState`] is shared by every tag of a template file. It interns
//! identifiers, owns the named-expression table (so a definition in one tag
//! is callable from the next) and the template-binding scopes. The types
//! stored for identifiers and named expressions come from the caller
//! through [`Artifacts`], which keeps this crate independent of the
//! runtime.

mod error;
mod operand;
mod parser;
mod state;
mod unit;

pub use error::{ParseError, ParseErrorKind};
pub use parser::parse;
pub use state::{Artifacts, ParseState};
pub use unit::Parsed;

#[cfg(test)]
mod tests;
