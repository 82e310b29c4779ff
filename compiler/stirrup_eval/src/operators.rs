//! Runtime semantics of the operators.
//!
//! - `+ - *` stay integral for two integers (checked) and go floating
//!   otherwise; `+` with a string on either side concatenates.
//! - `/ % **` and unary `-`/`+` are always floating.
//! - Bitwise operators need integral operands: integers, or doubles
//!   without a fractional part. Booleans are rejected.
//! - `< <= > >=` order numbers, strings and booleans; anything else is an
//!   error. `==` and `!=` use structural equality.
//! - `.. ..<` need integral bounds.
//!
//! The short-circuiting operators are evaluated lazily by the lowering;
//! [`selects_right`] is the shared decision for the selection family.

use std::borrow::Cow;
use std::cmp::Ordering;

use regex::Regex;
use stirrup_ir::{BinaryOp, UnaryOp};

use crate::errors::{
    cannot_index, halt, incomparable, index_out_of_bounds, integer_overflow,
    invalid_binary_operands, invalid_regex, invalid_unary_operand,
};
use crate::value::RangeValue;
use crate::{EvalResult, Value};

/// Whether a selection operator (`?? ?: !? !:`) yields its right operand.
pub fn selects_right(op: BinaryOp, left: &Value) -> bool {
    match op {
        BinaryOp::Coalesce => left.is_null(),
        BinaryOp::Elvis => !left.is_truthy(),
        BinaryOp::IfPresent => !left.is_null(),
        BinaryOp::IfTruthy => left.is_truthy(),
        _ => false,
    }
}

pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
            Ok(Value::from(format!("{left}{right}")))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => arithmetic(op, left, right),
        BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => floating(op, left, right),
        BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::UShr
        | BinaryOp::BitAnd
        | BinaryOp::BitXor
        | BinaryOp::BitOr => bitwise(op, left, right),
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = left
                .partial_compare(right)
                .ok_or_else(|| incomparable(left, right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Compare => compare(left, right),
        BinaryOp::Find | BinaryOp::Matches => regex_match(op, left, right),
        BinaryOp::Range | BinaryOp::RangeExclusive => {
            match (left.as_integral(), right.as_integral()) {
                (Some(start), Some(end)) => Ok(Value::Range(RangeValue::new(
                    start,
                    end,
                    op == BinaryOp::Range,
                ))),
                _ => Err(invalid_binary_operands(op, left, right)),
            }
        }
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOp::Coalesce | BinaryOp::Elvis | BinaryOp::IfPresent | BinaryOp::IfTruthy => {
            Ok(if selects_right(op, left) {
                right.clone()
            } else {
                left.clone()
            })
        }
    }
}

pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Die => Err(halt(operand.to_string())),
        UnaryOp::Negate | UnaryOp::Plus => match operand.as_f64() {
            Some(value) if op == UnaryOp::Negate => Ok(Value::Double(-value)),
            Some(value) => Ok(Value::Double(value)),
            None => Err(invalid_unary_operand(op, operand)),
        },
        UnaryOp::BitNot => operand
            .as_integral()
            .map(|n| Value::Int(!n))
            .ok_or_else(|| invalid_unary_operand(op, operand)),
    }
}

/// `receiver[index]`.
pub fn index(receiver: &Value, index: &Value) -> EvalResult {
    match receiver {
        Value::List(items) => {
            let i = index
                .as_integral()
                .ok_or_else(|| cannot_index(receiver, index))?;
            usize::try_from(i)
                .ok()
                .and_then(|u| items.get(u))
                .cloned()
                .ok_or_else(|| index_out_of_bounds(i, items.len()))
        }
        Value::Map(entries) => Ok(entries.get(index).cloned().unwrap_or(Value::Null)),
        Value::Str(s) => {
            let i = index
                .as_integral()
                .ok_or_else(|| cannot_index(receiver, index))?;
            usize::try_from(i)
                .ok()
                .and_then(|u| s.chars().nth(u))
                .map(|c| Value::from(c.to_string()))
                .ok_or_else(|| index_out_of_bounds(i, s.chars().count()))
        }
        Value::Object(object) if object.host_type().is_map_like() => Ok(object
            .host_type()
            .lookup(object, &index.to_string())
            .unwrap_or(Value::Null)),
        _ => Err(cannot_index(receiver, index)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (result, operation) = match op {
            BinaryOp::Add => (a.checked_add(*b), "addition"),
            BinaryOp::Sub => (a.checked_sub(*b), "subtraction"),
            _ => (a.checked_mul(*b), "multiplication"),
        };
        return result.map(Value::Int).ok_or_else(|| integer_overflow(operation));
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Double(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            _ => a * b,
        })),
        _ => Err(invalid_binary_operands(op, left, right)),
    }
}

fn floating(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Double(match op {
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            _ => a.powf(b),
        })),
        _ => Err(invalid_binary_operands(op, left, right)),
    }
}

#[allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation
)]
fn bitwise(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let (Some(a), Some(b)) = (left.as_integral(), right.as_integral()) else {
        return Err(invalid_binary_operands(op, left, right));
    };
    // Only the low six bits of a shift distance count.
    let shift = (b & 63) as u32;
    Ok(Value::Int(match op {
        BinaryOp::Shl => a.wrapping_shl(shift),
        BinaryOp::Shr => a.wrapping_shr(shift),
        BinaryOp::UShr => ((a as u64) >> shift) as i64,
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitXor => a ^ b,
        _ => a | b,
    }))
}

/// `<=>`: -1, 0 or 1. Null orders before everything.
fn compare(left: &Value, right: &Value) -> EvalResult {
    let ordering = match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => left
            .partial_compare(right)
            .ok_or_else(|| incomparable(left, right))?,
    };
    Ok(Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

/// `=~` finds the pattern anywhere; `==~` must match the whole text.
fn regex_match(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let pattern = match right {
        Value::Regex(regex) => regex.as_str(),
        Value::Str(pattern) => pattern,
        _ => return Err(invalid_binary_operands(op, left, right)),
    };
    let text = match left {
        Value::Str(s) => Cow::Borrowed(&**s),
        Value::Null => return Ok(Value::Bool(false)),
        other => Cow::Owned(other.to_string()),
    };
    let matched = match (op, right) {
        (BinaryOp::Find, Value::Regex(regex)) => regex.is_match(&text),
        (BinaryOp::Find, _) => Regex::new(pattern)
            .map_err(|e| invalid_regex(&e))?
            .is_match(&text),
        _ => Regex::new(&format!(r"\A(?:{pattern})\z"))
            .map_err(|e| invalid_regex(&e))?
            .is_match(&text),
    };
    Ok(Value::Bool(matched))
}
