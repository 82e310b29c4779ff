//! Stirrup IR - shared data model of the expression engine.
//!
//! This crate contains the types every stage agrees on:
//! - [`Span`] byte ranges for diagnostics
//! - [`Extensions`], the feature set a template loader enables
//! - [`Operator`], the fixed operator registry (precedence, associativity, arity flags)
//! - [`OperandType`], the static shape of an intermediate result
//! - [`Node`], the hashable expression IR emitted by the parser
//!
//! # Design Philosophy
//!
//! The IR is the structural-equality key for compiled-expression interning,
//! so every node is `Eq + Hash`. Floats are stored as bits, and identifiers
//! and named-expression targets are referenced by index into per-expression
//! tables instead of by pointer.

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod extensions;
mod node;
mod operand;
mod operator;
mod span;

pub use extensions::Extensions;
pub use node::{
    BinaryOp, FloatBits, IdentKey, InternalName, Literal, Lookup, Node, OutputMode, StreamOp,
    TemplateId, UnaryOp,
};
pub use operand::OperandType;
pub use operator::{Associativity, OpKind, Operator, OperatorFlags};
pub use span::Span;
