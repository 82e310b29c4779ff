//! Lowering of the expression IR to closures.
//!
//! Each [`Node`] becomes one boxed closure that owns the closures of its
//! children, so evaluation is a chain of direct calls with no tree walk or
//! dispatch on node kind. The resulting [`Program`] only depends on the
//! node, never on the tables of the expression it was compiled for: those
//! arrive at run time through [`Scope::unit`]. That is what lets
//! structurally equal expressions share one program.

use std::sync::Arc;

use regex::Regex;
use stirrup_ir::{BinaryOp, Literal, Node, StreamOp, UnaryOp};
use stirrup_stack::ensure_sufficient_stack;

use crate::errors::null_receiver;
use crate::expression::{invoke, ExpressionInner, Locals};
use crate::operators::{evaluate_binary, evaluate_unary, index, selects_right};
use crate::streamable::{Stage, Streamable};
use crate::{EvalError, EvalResult, RenderContext, Value};

/// A lowered expression.
pub(crate) type Program = Arc<dyn Fn(&mut Scope<'_>) -> EvalResult + Send + Sync>;

/// Everything a running program can touch.
pub(crate) struct Scope<'a> {
    pub(crate) ctx: &'a mut RenderContext,
    /// Tables of the expression being run.
    pub(crate) unit: &'a Arc<ExpressionInner>,
    pub(crate) locals: &'a Locals,
}

fn program(f: impl Fn(&mut Scope<'_>) -> EvalResult + Send + Sync + 'static) -> Program {
    Arc::new(f)
}

/// Lower `node`. Fails only on an invalid regex literal.
pub(crate) fn lower(node: &Node) -> Result<Program, regex::Error> {
    ensure_sufficient_stack(|| lower_node(node))
}

fn lower_all(nodes: &[Node]) -> Result<Vec<Program>, regex::Error> {
    nodes.iter().map(lower).collect()
}

fn eval_all(programs: &[Program], scope: &mut Scope<'_>) -> Result<Vec<Value>, EvalError> {
    programs.iter().map(|program| program(scope)).collect()
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Double(bits) => Value::Double(bits.get()),
        Literal::Str(s) => Value::string(s),
    }
}

fn lower_node(node: &Node) -> Result<Program, regex::Error> {
    let lowered = match node {
        Node::Literal(literal) => {
            let value = literal_value(literal);
            program(move |_| Ok(value.clone()))
        }
        Node::Regex(pattern) => {
            let value = Value::Regex(Arc::new(Regex::new(pattern)?));
            program(move |_| Ok(value.clone()))
        }
        &Node::Current { backreach } => program(move |s| Ok(s.ctx.section_value(backreach))),
        &Node::Internal { lookup, name } => program(move |s| s.ctx.internal(lookup, name)),
        &Node::Local(slot) => {
            let slot = slot as usize;
            program(move |s| Ok(s.locals.lock().get(slot).cloned().unwrap_or(Value::Null)))
        }
        &Node::Binding { template, slot } => program(move |s| Ok(s.ctx.binding(template, slot))),
        &Node::Identifier { ident, lookup } => {
            let ident = ident as usize;
            program(move |s| {
                let unit = s.unit;
                Ok(match unit.identifiers.get(ident) {
                    Some(identifier) => s.ctx.resolve(identifier, lookup, &[]),
                    None => Value::Null,
                })
            })
        }
        Node::Call {
            ident,
            lookup,
            args,
        } => {
            let (ident, lookup) = (*ident as usize, *lookup);
            let args = lower_all(args)?;
            program(move |s| {
                let values = eval_all(&args, s)?;
                let unit = s.unit;
                Ok(match unit.identifiers.get(ident) {
                    Some(identifier) => s.ctx.resolve(identifier, lookup, &values),
                    None => Value::Null,
                })
            })
        }
        Node::Member {
            receiver,
            ident,
            safe,
        } => {
            let (ident, safe) = (*ident as usize, *safe);
            let receiver = lower(receiver)?;
            program(move |s| {
                let target = receiver(s)?;
                member(s, &target, ident, &[], safe)
            })
        }
        Node::MethodCall {
            receiver,
            ident,
            args,
            safe,
        } => {
            let (ident, safe) = (*ident as usize, *safe);
            let receiver = lower(receiver)?;
            let args = lower_all(args)?;
            program(move |s| {
                let target = receiver(s)?;
                if target.is_null() && safe {
                    return Ok(Value::Null);
                }
                let values = eval_all(&args, s)?;
                member(s, &target, ident, &values, safe)
            })
        }
        Node::Index {
            receiver,
            index: key,
            safe,
        } => {
            let safe = *safe;
            let receiver = lower(receiver)?;
            let key = lower(key)?;
            program(move |s| {
                let target = receiver(s)?;
                if target.is_null() && safe {
                    return Ok(Value::Null);
                }
                let key = key(s)?;
                index(&target, &key)
            })
        }
        Node::Named { target, args } => {
            let target = *target as usize;
            let args = lower_all(args)?;
            program(move |s| {
                let values = eval_all(&args, s)?;
                let unit = s.unit;
                match unit.expressions.get(target) {
                    Some(callee) => callee.try_evaluate(s.ctx, &values),
                    None => Ok(Value::Null),
                }
            })
        }
        Node::Recurse { args } => {
            let args = lower_all(args)?;
            program(move |s| {
                let values = eval_all(&args, s)?;
                invoke(s.unit, s.ctx, &values)
            })
        }
        Node::Annotation { name, args } => {
            let name = name.clone();
            let args = lower_all(args)?;
            program(move |s| {
                let values = eval_all(&args, s)?;
                match s.ctx.annotation(&name) {
                    Some(handler) => handler(s.ctx, &values),
                    None => Ok(Value::Null),
                }
            })
        }
        Node::Unary { op, operand } => lower_unary(*op, operand)?,
        Node::Binary { op, left, right } => lower_binary(*op, left, right)?,
        Node::Ternary {
            condition,
            then,
            otherwise,
        } => {
            let condition = lower(condition)?;
            let then = lower(then)?;
            let otherwise = lower(otherwise)?;
            program(move |s| {
                if condition(s)?.is_truthy() {
                    then(s)
                } else {
                    otherwise(s)
                }
            })
        }
        Node::Concat(parts) => {
            let parts = lower_all(parts)?;
            program(move |s| {
                let mut text = String::new();
                for part in &parts {
                    match part(s)? {
                        Value::Str(piece) => text.push_str(&piece),
                        other => text.push_str(&other.to_string()),
                    }
                }
                Ok(Value::from(text))
            })
        }
        Node::List(items) => {
            let items = lower_all(items)?;
            program(move |s| Ok(Value::list(eval_all(&items, s)?)))
        }
        Node::Set(items) => {
            let items = lower_all(items)?;
            program(move |s| Ok(Value::set(eval_all(&items, s)?)))
        }
        Node::Map(pairs) => {
            let pairs = pairs
                .iter()
                .map(|(key, value)| -> Result<(Program, Program), regex::Error> {
                    Ok((lower(key)?, lower(value)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            program(move |s| {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in &pairs {
                    entries.push((key(s)?, value(s)?));
                }
                Ok(Value::map(entries))
            })
        }
        Node::AssignLocal { slot, value } => {
            let slot = *slot as usize;
            let value = lower(value)?;
            program(move |s| {
                let assigned = value(s)?;
                if let Some(local) = s.locals.lock().get_mut(slot) {
                    *local = assigned.clone();
                }
                Ok(assigned)
            })
        }
        Node::AssignBinding {
            template,
            slot,
            value,
        } => {
            let (template, slot) = (*template, *slot);
            let value = lower(value)?;
            program(move |s| {
                let assigned = value(s)?;
                s.ctx.set_binding(template, slot, assigned.clone())?;
                Ok(assigned)
            })
        }
        Node::Sequence(nodes) => {
            let nodes = lower_all(nodes)?;
            program(move |s| {
                let mut last = Value::Null;
                for node in &nodes {
                    last = node(s)?;
                }
                Ok(last)
            })
        }
        Node::Stream {
            op,
            source,
            binding,
            body,
        } => lower_stream(*op, source, *binding, body)?,
    };
    Ok(lowered)
}

fn member(
    s: &Scope<'_>,
    receiver: &Value,
    ident: usize,
    args: &[Value],
    safe: bool,
) -> EvalResult {
    let Some(identifier) = s.unit.identifiers.get(ident) else {
        return Ok(Value::Null);
    };
    if receiver.is_null() {
        return if safe {
            Ok(Value::Null)
        } else {
            Err(null_receiver(identifier.name()))
        };
    }
    Ok(identifier.get(receiver, args).unwrap_or(Value::Null))
}

fn lower_unary(op: UnaryOp, operand: &Node) -> Result<Program, regex::Error> {
    let operand = lower(operand)?;
    Ok(program(move |s| evaluate_unary(op, &operand(s)?)))
}

fn lower_binary(op: BinaryOp, left: &Node, right: &Node) -> Result<Program, regex::Error> {
    let left = lower(left)?;
    let right = lower(right)?;
    Ok(match op {
        BinaryOp::And => program(move |s| {
            Ok(Value::Bool(left(s)?.is_truthy() && right(s)?.is_truthy()))
        }),
        BinaryOp::Or => program(move |s| {
            Ok(Value::Bool(left(s)?.is_truthy() || right(s)?.is_truthy()))
        }),
        BinaryOp::Coalesce | BinaryOp::Elvis | BinaryOp::IfPresent | BinaryOp::IfTruthy => {
            program(move |s| {
                let value = left(s)?;
                if selects_right(op, &value) {
                    right(s)
                } else {
                    Ok(value)
                }
            })
        }
        _ => program(move |s| {
            let l = left(s)?;
            let r = right(s)?;
            evaluate_binary(op, &l, &r)
        }),
    })
}

fn lower_stream(
    op: StreamOp,
    source: &Node,
    binding: Option<u32>,
    body: &Node,
) -> Result<Program, regex::Error> {
    let source = lower(source)?;
    let body = lower(body)?;
    Ok(program(move |s| {
        let stage = Stage {
            upstream: Streamable::from_value(source(s)?),
            body: Arc::clone(&body),
            unit: Arc::clone(s.unit),
            locals: Arc::clone(s.locals),
            binding,
        };
        match op {
            StreamOp::Remap => Ok(Value::Stream(Streamable::remap(stage))),
            StreamOp::Filter => Ok(Value::Stream(Streamable::filter(stage))),
            StreamOp::FlatRemap => Ok(Value::Stream(Streamable::flat_remap(stage))),
            StreamOp::Reduce => stage.reduce(s.ctx),
            StreamOp::Return => stage.first(s.ctx),
        }
    }))
}
