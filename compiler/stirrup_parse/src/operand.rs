//! Operand stack entries.

use stirrup_ir::{Node, OperandType, Span};

/// A compiled fragment waiting on the operand stack.
#[derive(Clone, Debug)]
pub(crate) struct Operand {
    pub node: Node,
    pub ty: OperandType,
    pub span: Span,
    /// The value half of a `key: value` pair; `node` is the key.
    pub pair_value: Option<Node>,
    /// Bare unstated name this operand was read from, if any.
    pub name: Option<Box<str>>,
    /// Top-level `:=` statement.
    pub binds: bool,
}

impl Operand {
    pub fn new(node: Node, ty: OperandType, span: Span) -> Self {
        Operand {
            node,
            ty,
            span,
            pair_value: None,
            name: None,
            binds: false,
        }
    }

    pub fn object(node: Node, span: Span) -> Self {
        Self::new(node, OperandType::Object, span)
    }

    pub fn pair(key: Operand, value: Operand) -> Self {
        Operand {
            span: key.span.merge(value.span),
            node: key.node,
            ty: OperandType::Pair,
            pair_value: Some(value.node),
            name: None,
            binds: false,
        }
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn is_pair(&self) -> bool {
        self.ty == OperandType::Pair
    }
}
