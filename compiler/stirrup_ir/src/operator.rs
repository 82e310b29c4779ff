//! The fixed operator registry.
//!
//! Lower precedence numbers bind tighter. The table is authoritative: the
//! parser never derives precedence from anything else, and the lexer's
//! operator automaton recognizes exactly the tokens listed here.

use bitflags::bitflags;

use crate::{BinaryOp, StreamOp, UnaryOp};

bitflags! {
    /// Arity and behavior flags of an operator.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OperatorFlags: u16 {
        /// Takes an operand on its left.
        const LEFT_EXPRESSION = 1 << 0;
        /// Takes an operand on its right.
        const RIGHT_EXPRESSION = 1 << 1;
        /// Takes a comma-separated list of right operands.
        const X_RIGHT_EXPRESSIONS = 1 << 2;
        /// Method or named-expression call.
        const CALL = 1 << 3;
        /// Member navigation; the next token must be an identifier.
        const NAVIGATION = 1 << 4;
        /// Assigns to its left operand.
        const ASSIGNMENT = 1 << 5;
        /// Yields null instead of failing on a null left operand.
        const SAFE = 1 << 6;
        /// Opens a bracketed region closed by `closing`.
        const CONTAINER = 1 << 7;
        /// Streaming operator; may be followed by a `name ->` clause.
        const STREAMING = 1 << 8;
        /// Tolerates a trailing comma before the closing token.
        const TRAILING_COMMA = 1 << 9;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

/// What an operator does once both sides are known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `( expr )`
    Group,
    /// `[a, b]` or `[k: v]`
    ListLiteral,
    /// `{a, b}` or `{k: v}`
    SetLiteral,
    /// `name(args)`
    Call,
    /// `a[i]`
    Lookup,
    /// `a.b`
    Navigate,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `?` of a ternary.
    Ternary,
    /// `:` of a ternary, or the pair operator inside a map container.
    Colon,
    /// `=`
    Assign,
    /// `:=`
    Bind,
    Stream(StreamOp),
    /// `;`
    Sequence,
}

/// Immutable operator descriptor.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Operator {
    pub token: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub flags: OperatorFlags,
    pub closing: Option<&'static str>,
    pub kind: OpKind,
}

const L: OperatorFlags = OperatorFlags::LEFT_EXPRESSION;
const R: OperatorFlags = OperatorFlags::RIGHT_EXPRESSION;
const LR: OperatorFlags = L.union(R);

const fn op(
    token: &'static str,
    precedence: u8,
    associativity: Associativity,
    flags: OperatorFlags,
    kind: OpKind,
) -> Operator {
    Operator {
        token,
        precedence,
        associativity,
        flags,
        closing: None,
        kind,
    }
}

const fn container(
    token: &'static str,
    closing: &'static str,
    flags: OperatorFlags,
    kind: OpKind,
) -> Operator {
    Operator {
        token,
        precedence: 0,
        associativity: Associativity::Left,
        flags: flags.union(OperatorFlags::CONTAINER),
        closing: Some(closing),
        kind,
    }
}

const fn binary(token: &'static str, precedence: u8, op_: BinaryOp) -> Operator {
    op(token, precedence, Associativity::Left, LR, OpKind::Binary(op_))
}

const fn stream(token: &'static str, op_: StreamOp) -> Operator {
    op(
        token,
        18,
        Associativity::Left,
        LR.union(OperatorFlags::STREAMING),
        OpKind::Stream(op_),
    )
}

const VARIADIC: OperatorFlags = R
    .union(OperatorFlags::X_RIGHT_EXPRESSIONS)
    .union(OperatorFlags::TRAILING_COMMA);

/// Operators valid where an operand is expected.
static PREFIX: &[Operator] = &[
    container("(", ")", R, OpKind::Group),
    container("[", "]", VARIADIC, OpKind::ListLiteral),
    container("{", "}", VARIADIC, OpKind::SetLiteral),
    op("!", 2, Associativity::Right, R, OpKind::Unary(UnaryOp::Not)),
    op("-", 2, Associativity::Right, R, OpKind::Unary(UnaryOp::Negate)),
    op("+", 2, Associativity::Right, R, OpKind::Unary(UnaryOp::Plus)),
    op("~", 2, Associativity::Right, R, OpKind::Unary(UnaryOp::BitNot)),
    op("☠", 19, Associativity::Right, R, OpKind::Unary(UnaryOp::Die)),
];

/// Operators valid after an operand.
static INFIX: &[Operator] = &[
    op(".", 0, Associativity::Left, L.union(OperatorFlags::NAVIGATION), OpKind::Navigate),
    op(
        "?.",
        0,
        Associativity::Left,
        L.union(OperatorFlags::NAVIGATION).union(OperatorFlags::SAFE),
        OpKind::Navigate,
    ),
    container("[", "]", LR, OpKind::Lookup),
    container("?[", "]", LR.union(OperatorFlags::SAFE), OpKind::Lookup),
    op("**", 1, Associativity::Right, LR, OpKind::Binary(BinaryOp::Pow)),
    binary("*", 3, BinaryOp::Mul),
    binary("/", 3, BinaryOp::Div),
    binary("%", 3, BinaryOp::Mod),
    binary("+", 4, BinaryOp::Add),
    binary("-", 4, BinaryOp::Sub),
    binary("<<", 5, BinaryOp::Shl),
    binary(">>", 5, BinaryOp::Shr),
    binary(">>>", 5, BinaryOp::UShr),
    binary("..", 6, BinaryOp::Range),
    binary("..<", 6, BinaryOp::RangeExclusive),
    binary("<=>", 7, BinaryOp::Compare),
    binary("<", 8, BinaryOp::Lt),
    binary("<=", 8, BinaryOp::LtEq),
    binary(">", 8, BinaryOp::Gt),
    binary(">=", 8, BinaryOp::GtEq),
    binary("==", 9, BinaryOp::Eq),
    binary("!=", 9, BinaryOp::NotEq),
    binary("=~", 9, BinaryOp::Find),
    binary("==~", 9, BinaryOp::Matches),
    binary("&", 10, BinaryOp::BitAnd),
    binary("^", 11, BinaryOp::BitXor),
    binary("|", 12, BinaryOp::BitOr),
    binary("&&", 13, BinaryOp::And),
    binary("||", 14, BinaryOp::Or),
    binary("??", 15, BinaryOp::Coalesce),
    binary("?:", 15, BinaryOp::Elvis),
    binary("!?", 15, BinaryOp::IfPresent),
    binary("!:", 15, BinaryOp::IfTruthy),
    op("?", 16, Associativity::Right, LR, OpKind::Ternary),
    op(":", 16, Associativity::Right, LR, OpKind::Colon),
    op(
        "=",
        17,
        Associativity::Right,
        LR.union(OperatorFlags::ASSIGNMENT),
        OpKind::Assign,
    ),
    op(
        ":=",
        17,
        Associativity::Right,
        LR.union(OperatorFlags::ASSIGNMENT),
        OpKind::Bind,
    ),
    stream("#>", StreamOp::Remap),
    stream("#.", StreamOp::Remap),
    stream("#|", StreamOp::FlatRemap),
    stream("#?", StreamOp::Filter),
    stream("#<", StreamOp::Reduce),
    stream("#^", StreamOp::Return),
    op(";", 20, Associativity::Left, LR, OpKind::Sequence),
];

/// The call operator pushed for `name(`; never looked up by token.
static CALL: Operator = container(
    "(",
    ")",
    VARIADIC.union(OperatorFlags::CALL),
    OpKind::Call,
);

impl Operator {
    /// Look up an operator that may start an operand.
    pub fn prefix(token: &str) -> Option<&'static Operator> {
        PREFIX.iter().find(|op| op.token == token)
    }

    /// Look up an operator that follows an operand.
    pub fn infix(token: &str) -> Option<&'static Operator> {
        INFIX.iter().find(|op| op.token == token)
    }

    /// The call operator.
    pub fn call() -> &'static Operator {
        &CALL
    }

    /// Every prefix operator.
    pub fn prefix_operators() -> &'static [Operator] {
        PREFIX
    }

    /// Every infix operator.
    pub fn infix_operators() -> &'static [Operator] {
        INFIX
    }

    #[inline]
    pub fn has_left(&self) -> bool {
        self.flags.contains(OperatorFlags::LEFT_EXPRESSION)
    }

    #[inline]
    pub fn has_right(&self) -> bool {
        self.flags.contains(OperatorFlags::RIGHT_EXPRESSION)
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.flags.contains(OperatorFlags::CONTAINER)
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.flags.contains(OperatorFlags::X_RIGHT_EXPRESSIONS)
    }

    #[inline]
    pub fn allows_trailing_comma(&self) -> bool {
        self.flags.contains(OperatorFlags::TRAILING_COMMA)
    }

    #[inline]
    pub fn is_safe(&self) -> bool {
        self.flags.contains(OperatorFlags::SAFE)
    }

    #[inline]
    pub fn is_navigation(&self) -> bool {
        self.flags.contains(OperatorFlags::NAVIGATION)
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.flags.contains(OperatorFlags::STREAMING)
    }

    /// Whether `self`, sitting on the operator stack, must be applied before
    /// `incoming` is pushed.
    ///
    /// Containers are only resolved by their closing token. Prefix operators
    /// never force a pop since they have no left operand to claim.
    pub fn yields_to(&self, incoming: &Operator) -> bool {
        if self.is_container() || !incoming.has_left() {
            return false;
        }
        self.precedence < incoming.precedence
            || (self.precedence == incoming.precedence
                && incoming.associativity == Associativity::Left)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]
mod tests;
