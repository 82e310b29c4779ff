//! Runtime values.
//!
//! Collections are reference counted so that cloning a value (which
//! happens on every local read and every section push) never copies
//! elements. Maps and sets are ordered by the total order defined on
//! [`Value`] itself.

use std::any::Any;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::host::{HostObject, HostType};
use crate::streamable::Streamable;

/// Integer range produced by `..` and `..<`.
///
/// Only ascending ranges contain elements; `5..1` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeValue {
    pub start: i64,
    pub end: i64,
    pub inclusive: bool,
}

impl RangeValue {
    pub fn new(start: i64, end: i64, inclusive: bool) -> Self {
        RangeValue {
            start,
            end,
            inclusive,
        }
    }

    /// First and last element, or `None` when the range is empty.
    pub fn bounds(self) -> Option<(i64, i64)> {
        let last = if self.inclusive {
            self.end
        } else {
            self.end.checked_sub(1)?
        };
        (self.start <= last).then_some((self.start, last))
    }

    pub fn len(self) -> usize {
        self.bounds().map_or(0, |(first, last)| {
            let count = i128::from(last) - i128::from(first) + 1;
            usize::try_from(count).unwrap_or(usize::MAX)
        })
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.bounds().is_none()
    }

    pub fn contains(self, value: i64) -> bool {
        self.bounds()
            .is_some_and(|(first, last)| first <= value && value <= last)
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.inclusive { ".." } else { "..<" };
        write!(f, "{}{op}{}", self.start, self.end)
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<Value, Value>>),
    Set(Arc<BTreeSet<Value>>),
    Range(RangeValue),
    /// Lazy single-pass sequence produced by a streaming operator.
    Stream(Streamable),
    Regex(Arc<Regex>),
    /// A host value together with the provider describing its members.
    Object(HostObject),
    /// A host type token exposing static members.
    Type(Arc<HostType>),
}

impl Value {
    #[inline]
    pub fn string(value: &str) -> Self {
        Value::Str(value.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(Arc::new(entries.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(Arc::new(items.into_iter().collect()))
    }

    /// Wrap a host value described by `ty`.
    pub fn object<T: Any + Send + Sync>(value: T, ty: &Arc<HostType>) -> Self {
        Value::Object(HostObject::new(value, Arc::clone(ty)))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The one truthiness rule used by `!`, `&&`, `||`, `?:`, `!:`, `?`
    /// and filters.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Set(items) => !items.is_empty(),
            Value::Range(range) => !range.is_empty(),
            Value::Stream(_) | Value::Regex(_) | Value::Object(_) | Value::Type(_) => true,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Integral view of a number; doubles qualify only without a fraction.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Double(d)
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 =>
            {
                Some(*d as i64)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Stream(_) => "stream",
            Value::Regex(_) => "regex",
            Value::Object(object) => return Cow::Borrowed(object.host_type().name()),
            Value::Type(_) => "type",
        })
    }

    /// Ordering for `< <= > >= <=>`: numbers, strings and booleans only.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
                Some(compare_numbers(self, other))
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Double(_) => 2,
            Value::Str(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
            Value::Set(_) => 6,
            Value::Range(_) => 7,
            Value::Regex(_) => 8,
            Value::Stream(_) => 9,
            Value::Object(_) => 10,
            Value::Type(_) => 11,
        }
    }
}

/// Exact numeric order across `Int` and `Double`.
///
/// Zeroes of either sign are equal; NaNs sort beyond the infinities on
/// their sign's side.
fn compare_numbers(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Double(a), Value::Double(b)) => compare_doubles(*a, *b),
        (Value::Int(a), Value::Double(b)) => compare_int_double(*a, *b),
        (Value::Double(a), Value::Int(b)) => compare_int_double(*b, *a).reverse(),
        _ => Ordering::Equal,
    }
}

fn compare_doubles(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// `2^63`, the first double above every `i64`.
const I64_END: f64 = 9_223_372_036_854_775_808.0;

#[allow(clippy::cast_possible_truncation)]
fn compare_int_double(int: i64, double: f64) -> Ordering {
    if double.is_nan() {
        return if double.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if double >= I64_END {
        return Ordering::Less;
    }
    if double < -I64_END {
        return Ordering::Greater;
    }
    let whole = double.trunc();
    int.cmp(&(whole as i64))
        .then_with(|| compare_doubles(0.0, double - whole))
}

/// Total order: values of different kinds order by kind, numbers compare
/// numerically across `Int` and `Double`, opaque values by identity.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
                compare_numbers(self, other)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Range(a), Value::Range(b)) => a.cmp(b),
            (Value::Regex(a), Value::Regex(b)) => a.as_str().cmp(b.as_str()),
            (Value::Stream(a), Value::Stream(b)) => a.address().cmp(&b.address()),
            (Value::Object(a), Value::Object(b)) => a.address().cmp(&b.address()),
            (Value::Type(a), Value::Type(b)) => a
                .name()
                .cmp(b.name())
                .then_with(|| a.id().cmp(&b.id())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d:?}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Value::Map(entries) if entries.is_empty() => f.write_str("[:]"),
            Value::Map(entries) => {
                f.write_str("[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("]")
            }
            Value::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items.iter())?;
                f.write_str("}")
            }
            Value::Range(range) => write!(f, "{range}"),
            Value::Stream(_) => f.write_str("<stream>"),
            Value::Regex(regex) => f.write_str(regex.as_str()),
            Value::Object(object) => match object.host_type().display(object) {
                Some(text) => f.write_str(&text),
                None => write!(f, "<{}>", object.host_type().name()),
            },
            Value::Type(ty) => f.write_str(ty.name()),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}
