//! Expression IR.
//!
//! A parsed expression is a tree of [`Node`]s. The tree is the program's
//! identity: two expressions whose trees compare equal share one lowered
//! executable. Everything that differs between otherwise identical
//! expressions (the interned identifiers, the named expressions they call)
//! lives in side tables indexed by the `u32`s stored here.

use std::fmt;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Bitwise
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitXor,
    BitOr,

    // Logical
    And,
    Or,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Compare,
    Find,
    Matches,

    // Ranges
    Range,
    RangeExclusive,

    // Null/falsy selection
    Coalesce,
    Elvis,
    IfPresent,
    IfTruthy,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::And => "&&",
            Self::Or => "||",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Compare => "<=>",
            Self::Find => "=~",
            Self::Matches => "==~",
            Self::Range => "..",
            Self::RangeExclusive => "..<",
            Self::Coalesce => "??",
            Self::Elvis => "?:",
            Self::IfPresent => "!?",
            Self::IfTruthy => "!:",
        }
    }

    /// Whether the right operand is evaluated only on demand.
    pub const fn is_lazy(self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Coalesce | Self::Elvis | Self::IfPresent | Self::IfTruthy
        )
    }

    /// Whether both operands are coerced to integral values.
    pub const fn is_bitwise(self) -> bool {
        matches!(
            self,
            Self::Shl | Self::Shr | Self::UShr | Self::BitAnd | Self::BitXor | Self::BitOr
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
    /// `☠`: abort the whole render with the operand as message.
    Die,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
            Self::Plus => "+",
            Self::BitNot => "~",
            Self::Die => "☠",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Streaming operators over lazy sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamOp {
    /// `#>` / `#.`
    Remap,
    /// `#|`
    FlatRemap,
    /// `#?`
    Filter,
    /// `#<`
    Reduce,
    /// `#^`
    Return,
}

impl StreamOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Remap => "#>",
            Self::FlatRemap => "#|",
            Self::Filter => "#?",
            Self::Reduce => "#<",
            Self::Return => "#^",
        }
    }
}

/// Which section frame an identifier is resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Search outward from the innermost frame until something resolves.
    Unstated,
    /// Exactly `n` frames above the innermost one (`./` is 0, `../` is 1).
    Backreach(u32),
    /// The outermost frame (`/name` or `\name`).
    Root,
}

/// Iteration metadata exposed through `.index`, `.hasNext` and `.isFirst`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InternalName {
    Index,
    HasNext,
    IsFirst,
}

impl InternalName {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "index" => Some(Self::Index),
            "hasNext" => Some(Self::HasNext),
            "isFirst" => Some(Self::IsFirst),
            _ => None,
        }
    }
}

/// Identity of a template (or inline partial) owning persistent bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u32);

impl TemplateId {
    /// The scope every parse state starts with.
    pub const ROOT: TemplateId = TemplateId(0);
}

/// Name + arity identity of an identifier.
///
/// `arity` is `None` for a property access and `Some(n)` for a method call
/// with `n` arguments; the two never share a resolver cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentKey {
    pub name: Box<str>,
    pub arity: Option<u32>,
}

impl IdentKey {
    pub fn property(name: &str) -> Self {
        IdentKey {
            name: name.into(),
            arity: None,
        }
    }

    pub fn method(name: &str, arity: u32) -> Self {
        IdentKey {
            name: name.into(),
            arity: Some(arity),
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            None => f.write_str(&self.name),
            Some(n) => write!(f, "{}/{n}", self.name),
        }
    }
}

/// `f64` stored as bits so literals can be hashed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatBits(u64);

impl FloatBits {
    #[inline]
    pub fn new(value: f64) -> Self {
        FloatBits(value.to_bits())
    }

    #[inline]
    pub fn get(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Debug for FloatBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.get())
    }
}

/// Constant values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(FloatBits),
    Str(Box<str>),
}

impl Literal {
    #[inline]
    pub fn double(value: f64) -> Self {
        Literal::Double(FloatBits::new(value))
    }
}

/// Whether a tag's result is written to the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    #[default]
    Render,
    /// Evaluated for effect only (`:=` bindings, `=>` definitions).
    Discard,
}

/// Expression tree node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Literal(Literal),
    /// `~/pattern/`
    Regex(Box<str>),
    /// `.`, `..`, `../..`: the value of a section frame.
    Current {
        backreach: u32,
    },
    /// `.index`, `../.hasNext`, ...
    Internal {
        lookup: Lookup,
        name: InternalName,
    },
    /// Read of a local binding slot.
    Local(u32),
    /// Read of a persistent template binding.
    Binding {
        template: TemplateId,
        slot: u32,
    },
    /// Property lookup against the section stack; `ident` indexes the
    /// expression's identifier table.
    Identifier {
        ident: u32,
        lookup: Lookup,
    },
    /// Method call without a receiver, resolved against the section stack.
    Call {
        ident: u32,
        lookup: Lookup,
        args: Vec<Node>,
    },
    Member {
        receiver: Box<Node>,
        ident: u32,
        safe: bool,
    },
    MethodCall {
        receiver: Box<Node>,
        ident: u32,
        args: Vec<Node>,
        safe: bool,
    },
    Index {
        receiver: Box<Node>,
        index: Box<Node>,
        safe: bool,
    },
    /// Call of a previously defined named expression; `target` indexes the
    /// expression's named-expression table.
    Named {
        target: u32,
        args: Vec<Node>,
    },
    /// Self-call from inside a named expression's own body.
    Recurse {
        args: Vec<Node>,
    },
    Annotation {
        name: Box<str>,
        args: Vec<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Ternary {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    /// String concatenation of every part.
    Concat(Vec<Node>),
    List(Vec<Node>),
    Set(Vec<Node>),
    Map(Vec<(Node, Node)>),
    AssignLocal {
        slot: u32,
        value: Box<Node>,
    },
    AssignBinding {
        template: TemplateId,
        slot: u32,
        value: Box<Node>,
    },
    /// `a; b; c` evaluates in order and yields the last value.
    Sequence(Vec<Node>),
    Stream {
        op: StreamOp,
        source: Box<Node>,
        /// Local slot receiving each element; `None` pushes the element as
        /// a section frame instead.
        binding: Option<u32>,
        body: Box<Node>,
    },
}

impl Node {
    #[inline]
    pub fn string(value: &str) -> Self {
        Node::Literal(Literal::Str(value.into()))
    }

    #[inline]
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}
