//! Members of builtin values.
//!
//! Resolved through the same identifier cache as host members, so a
//! builtin is looked up once per (identifier, receiver shape).

use std::sync::Arc;

use crate::errors::{index_out_of_bounds, invalid_argument};
use crate::{EvalError, EvalResult, Value};

pub(crate) type BuiltinFn = fn(&Value, &[Value]) -> EvalResult;

pub(crate) fn lookup(receiver: &Value, name: &str, arity: usize) -> Option<BuiltinFn> {
    match receiver {
        Value::Str(_) => string_method(name, arity),
        Value::List(_) => list_method(name, arity),
        Value::Map(_) => map_method(name, arity),
        Value::Set(_) => set_method(name, arity),
        Value::Range(_) => range_method(name, arity),
        _ => None,
    }
}

fn string_method(name: &str, arity: usize) -> Option<BuiltinFn> {
    let method: BuiltinFn = match (name, arity) {
        ("length", 0) => |r, _| Ok(count(text(r)?.chars().count())),
        ("isEmpty", 0) => |r, _| Ok(Value::Bool(text(r)?.is_empty())),
        ("toUpperCase", 0) => |r, _| Ok(text(r)?.to_uppercase().into()),
        ("toLowerCase", 0) => |r, _| Ok(text(r)?.to_lowercase().into()),
        ("trim", 0) => |r, _| Ok(text(r)?.trim().into()),
        ("contains", 1) => |r, a| Ok(Value::Bool(text(r)?.contains(&*a[0].to_string()))),
        ("startsWith", 1) => |r, a| Ok(Value::Bool(text(r)?.starts_with(&*a[0].to_string()))),
        ("endsWith", 1) => |r, a| Ok(Value::Bool(text(r)?.ends_with(&*a[0].to_string()))),
        ("indexOf", 1) => |r, a| {
            let haystack = text(r)?;
            let needle = a[0].to_string();
            Ok(match haystack.find(&needle) {
                Some(byte) => count(haystack[..byte].chars().count()),
                None => Value::Int(-1),
            })
        },
        ("substring", 1) => |r, a| {
            let s = text(r)?;
            let start = char_index("substring", &a[0], s)?;
            Ok(s.chars().skip(start).collect::<String>().into())
        },
        ("substring", 2) => |r, a| {
            let s = text(r)?;
            let start = char_index("substring", &a[0], s)?;
            let end = char_index("substring", &a[1], s)?;
            if end < start {
                return Err(index_out_of_bounds(to_int(end), start));
            }
            Ok(s.chars().skip(start).take(end - start).collect::<String>().into())
        },
        ("replace", 2) => |r, a| Ok(text(r)?.replace(&*a[0].to_string(), &a[1].to_string()).into()),
        ("split", 1) => |r, a| {
            let separator = a[0].to_string();
            let parts = text(r)?.split(&*separator).map(Value::from).collect();
            Ok(Value::list(parts))
        },
        ("charAt", 1) => |r, a| {
            let s = text(r)?;
            let index = integer("charAt", &a[0])?;
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::from(c.to_string()))
                .ok_or_else(|| index_out_of_bounds(index, s.chars().count()))
        },
        _ => return None,
    };
    Some(method)
}

fn list_method(name: &str, arity: usize) -> Option<BuiltinFn> {
    let method: BuiltinFn = match (name, arity) {
        ("size", 0) => |r, _| Ok(count(list(r)?.len())),
        ("isEmpty", 0) => |r, _| Ok(Value::Bool(list(r)?.is_empty())),
        ("get", 1) => |r, a| {
            let items = list(r)?;
            let index = integer("get", &a[0])?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| index_out_of_bounds(index, items.len()))
        },
        ("contains", 1) => |r, a| Ok(Value::Bool(list(r)?.contains(&a[0]))),
        ("indexOf", 1) => |r, a| {
            Ok(list(r)?
                .iter()
                .position(|item| *item == a[0])
                .map_or(Value::Int(-1), count))
        },
        _ => return None,
    };
    Some(method)
}

fn map_method(name: &str, arity: usize) -> Option<BuiltinFn> {
    let method: BuiltinFn = match (name, arity) {
        ("size", 0) => |r, _| Ok(count(map(r)?.len())),
        ("isEmpty", 0) => |r, _| Ok(Value::Bool(map(r)?.is_empty())),
        ("get", 1) => |r, a| Ok(map(r)?.get(&a[0]).cloned().unwrap_or(Value::Null)),
        ("containsKey", 1) => |r, a| Ok(Value::Bool(map(r)?.contains_key(&a[0]))),
        ("keySet", 0) => |r, _| Ok(Value::set(map(r)?.keys().cloned())),
        ("values", 0) => |r, _| Ok(Value::list(map(r)?.values().cloned().collect())),
        _ => return None,
    };
    Some(method)
}

fn set_method(name: &str, arity: usize) -> Option<BuiltinFn> {
    let method: BuiltinFn = match (name, arity) {
        ("size", 0) => |r, _| Ok(count(set(r)?.len())),
        ("isEmpty", 0) => |r, _| Ok(Value::Bool(set(r)?.is_empty())),
        ("contains", 1) => |r, a| Ok(Value::Bool(set(r)?.contains(&a[0]))),
        _ => return None,
    };
    Some(method)
}

fn range_method(name: &str, arity: usize) -> Option<BuiltinFn> {
    let method: BuiltinFn = match (name, arity) {
        ("size", 0) => |r, _| match r {
            Value::Range(range) => Ok(count(range.len())),
            other => Err(invalid_argument("size", "a range", other)),
        },
        ("contains", 1) => |r, a| match r {
            Value::Range(range) => Ok(Value::Bool(
                a[0].as_integral().is_some_and(|n| range.contains(n)),
            )),
            other => Err(invalid_argument("contains", "a range", other)),
        },
        _ => return None,
    };
    Some(method)
}

fn text(value: &Value) -> Result<&str, EvalError> {
    value
        .as_str()
        .ok_or_else(|| invalid_argument("string method", "a string", value))
}

fn list(value: &Value) -> Result<&Arc<Vec<Value>>, EvalError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(invalid_argument("list method", "a list", other)),
    }
}

fn map(value: &Value) -> Result<&std::collections::BTreeMap<Value, Value>, EvalError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(invalid_argument("map method", "a map", other)),
    }
}

fn set(value: &Value) -> Result<&std::collections::BTreeSet<Value>, EvalError> {
    match value {
        Value::Set(items) => Ok(items),
        other => Err(invalid_argument("set method", "a set", other)),
    }
}

fn integer(method: &'static str, value: &Value) -> Result<i64, EvalError> {
    value
        .as_integral()
        .ok_or_else(|| invalid_argument(method, "an integer", value))
}

/// Character index within `0..=len`.
fn char_index(method: &'static str, value: &Value, s: &str) -> Result<usize, EvalError> {
    let index = integer(method, value)?;
    let len = s.chars().count();
    match usize::try_from(index) {
        Ok(i) if i <= len => Ok(i),
        _ => Err(index_out_of_bounds(index, len)),
    }
}

fn count(n: usize) -> Value {
    Value::Int(to_int(n))
}

fn to_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
