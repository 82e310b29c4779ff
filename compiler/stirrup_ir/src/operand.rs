//! Static shape of an intermediate result.

use std::fmt;

/// What the parser knows about an operand's runtime shape.
///
/// Used to choose a compiled form (string concatenation vs. numeric
/// addition) and to reject operator misuse before anything runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandType {
    Boolean,
    Integral,
    Floating,
    /// Unknown until runtime.
    Object,
    /// A string, or a concatenation still being built.
    StringBuilder,
    /// `key: value` waiting for an enclosing map container.
    Pair,
}

impl OperandType {
    /// Whether the value is statically known to be numeric.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, OperandType::Integral | OperandType::Floating)
    }

    /// Whether the value could be numeric at runtime.
    #[inline]
    pub fn may_be_numeric(self) -> bool {
        matches!(
            self,
            OperandType::Integral | OperandType::Floating | OperandType::Object
        )
    }

    /// Whether the value could be integral at runtime.
    #[inline]
    pub fn may_be_integral(self) -> bool {
        matches!(self, OperandType::Integral | OperandType::Object)
    }

    /// Result type of `+ - *` on two numeric operands.
    pub fn arithmetic(self, other: OperandType) -> OperandType {
        match (self, other) {
            (OperandType::Integral, OperandType::Integral) => OperandType::Integral,
            (OperandType::Floating, _) | (_, OperandType::Floating) => OperandType::Floating,
            _ => OperandType::Object,
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandType::Boolean => "boolean",
            OperandType::Integral => "integral",
            OperandType::Floating => "floating",
            OperandType::Object => "object",
            OperandType::StringBuilder => "string",
            OperandType::Pair => "pair",
        };
        f.write_str(name)
    }
}
