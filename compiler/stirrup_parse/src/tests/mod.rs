//! Parser tests.
//!
//! - `parser`: operators, precedence, containers and error reporting
//! - `scoping`: locals, template bindings, named expressions, interpolation

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod scoping;

use stirrup_ir::{IdentKey, Node};

use crate::{parse, Artifacts, ParseError, ParseErrorKind, ParseState, Parsed};

/// Identifiers are their keys; named expressions are their names.
pub(crate) struct Names;

impl Artifacts for Names {
    type Identifier = IdentKey;
    type Expression = String;

    fn identifier(key: &IdentKey) -> IdentKey {
        key.clone()
    }
}

pub(crate) fn parse_in(text: &str, state: &mut ParseState<Names>) -> Parsed<Names> {
    match parse(text, 0, state) {
        Ok(parsed) => parsed,
        Err(error) => panic!("failed to parse {text:?}: {error}"),
    }
}

pub(crate) fn node(text: &str) -> Node {
    parse_in(text, &mut ParseState::new()).node
}

pub(crate) fn error(text: &str) -> ParseError {
    match parse(text, 0, &mut ParseState::<Names>::new()) {
        Ok(parsed) => panic!("expected {text:?} to fail, got {:?}", parsed.node),
        Err(error) => error,
    }
}

pub(crate) fn error_kind(text: &str) -> ParseErrorKind {
    error(text).kind
}
