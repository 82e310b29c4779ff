//! Per-expression compilation unit and its output.

use std::fmt;

use rustc_hash::FxHashMap;
use stirrup_ir::{IdentKey, Node, OperandType, OutputMode, Span};

use crate::{Artifacts, ParseState};

/// The result of compiling one expression.
///
/// `node` refers to identifiers and named expressions by index into
/// `identifiers` and `expressions`, so two expressions with equal nodes run
/// the same program against different tables.
pub struct Parsed<A: Artifacts> {
    pub node: Node,
    pub ty: OperandType,
    /// Set when the expression is a named-expression definition.
    pub name: Option<Box<str>>,
    /// Declared parameter count of a named expression.
    pub params: u32,
    pub identifiers: Vec<A::Identifier>,
    pub expressions: Vec<A::Expression>,
    /// Local slots the program needs.
    pub local_count: u32,
    pub output: OutputMode,
    pub span: Span,
}

// Tables print as sizes; their element types need not be `Debug`.
impl<A: Artifacts> fmt::Debug for Parsed<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parsed")
            .field("node", &self.node)
            .field("ty", &self.ty)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("identifiers", &self.identifiers.len())
            .field("expressions", &self.expressions.len())
            .field("local_count", &self.local_count)
            .field("output", &self.output)
            .field("span", &self.span)
            .finish()
    }
}

/// Tables shared by an expression and its interpolation sub-expressions.
pub(crate) struct Unit<A: Artifacts> {
    identifiers: Vec<A::Identifier>,
    identifier_index: FxHashMap<IdentKey, u32>,
    expressions: Vec<A::Expression>,
    expression_index: FxHashMap<Box<str>, u32>,
    /// Visible local names, innermost last.
    locals: Vec<(Box<str>, u32)>,
    local_count: u32,
    /// Name of the named expression whose body is being compiled.
    pub(crate) defining: Option<Box<str>>,
}

impl<A: Artifacts> Unit<A> {
    pub(crate) fn new() -> Self {
        Unit {
            identifiers: Vec::new(),
            identifier_index: FxHashMap::default(),
            expressions: Vec::new(),
            expression_index: FxHashMap::default(),
            locals: Vec::new(),
            local_count: 0,
            defining: None,
        }
    }

    /// Index of `key` in this unit's identifier table.
    pub(crate) fn identifier(&mut self, state: &mut ParseState<A>, key: IdentKey) -> u32 {
        if let Some(&index) = self.identifier_index.get(&key) {
            return index;
        }
        let index = table_index(self.identifiers.len());
        self.identifiers.push(state.intern(&key));
        self.identifier_index.insert(key, index);
        index
    }

    /// Index of the named expression `name` in this unit's table.
    pub(crate) fn expression(&mut self, name: &str, expression: &A::Expression) -> u32 {
        if let Some(&index) = self.expression_index.get(name) {
            return index;
        }
        let index = table_index(self.expressions.len());
        self.expressions.push(expression.clone());
        self.expression_index.insert(name.into(), index);
        index
    }

    pub(crate) fn local(&self, name: &str) -> Option<u32> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| &**local == name)
            .map(|&(_, slot)| slot)
    }

    /// Allocate a fresh slot visible as `name` until the scope ends.
    pub(crate) fn declare_local(&mut self, name: &str) -> u32 {
        let slot = self.local_count;
        self.local_count += 1;
        self.locals.push((name.into(), slot));
        slot
    }

    /// Marker to pass to [`Unit::end_scope`].
    #[inline]
    pub(crate) fn scope_mark(&self) -> usize {
        self.locals.len()
    }

    #[inline]
    pub(crate) fn end_scope(&mut self, mark: usize) {
        self.locals.truncate(mark);
    }

    pub(crate) fn finish(
        self,
        node: Node,
        ty: OperandType,
        name: Option<Box<str>>,
        params: u32,
        output: OutputMode,
        span: Span,
    ) -> Parsed<A> {
        Parsed {
            node,
            ty,
            name,
            params,
            identifiers: self.identifiers,
            expressions: self.expressions,
            local_count: self.local_count,
            output,
            span,
        }
    }
}

fn table_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
