//! Lazy single-pass sequences.
//!
//! [`Streamable::from_value`] adapts anything to a sequence: lists, sets,
//! ranges and iterable host objects yield their elements, maps yield
//! `[key: k, value: v]` entries, null is empty and any other value is a
//! one-element sequence. Remap, filter and flat-remap chain a new stage
//! onto an upstream sequence without pulling anything; reduce and early
//! return drive the chain and stop as soon as they have their answer.
//!
//! A sequence is shared, not copied: cloning a `Streamable` hands out the
//! same cursor.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::expression::{ExpressionInner, Locals};
use crate::lower::{Program, Scope};
use crate::value::RangeValue;
use crate::{EvalError, EvalResult, RenderContext, Value};

#[derive(Clone)]
pub struct Streamable(Arc<StreamInner>);

struct StreamInner {
    kind: Kind,
    state: Mutex<State>,
}

enum Kind {
    Source,
    Map(Stage),
    Filter(Stage),
    FlatMap(Stage),
}

#[derive(Default)]
struct State {
    /// Element pulled early by `has_next`.
    peeked: Option<Value>,
    source: Source,
    /// Upstream elements consumed by this stage.
    pulled: usize,
    /// Flat-map: the sequence currently being drained.
    inner: Option<Streamable>,
}

#[derive(Default)]
enum Source {
    #[default]
    Empty,
    List {
        items: Arc<Vec<Value>>,
        next: usize,
    },
    Values(std::vec::IntoIter<Value>),
    Range {
        next: i64,
        last: i64,
    },
    Single(Value),
}

impl Source {
    fn next(&mut self) -> Option<Value> {
        match self {
            Source::Empty => None,
            Source::List { items, next } => {
                let item = items.get(*next).cloned();
                *next += 1;
                item
            }
            Source::Values(values) => values.next(),
            Source::Range { next, last } => {
                let current = *next;
                match current.checked_add(1) {
                    Some(following) if current < *last => *next = following,
                    _ => *self = Source::Empty,
                }
                Some(Value::Int(current))
            }
            Source::Single(_) => match std::mem::take(self) {
                Source::Single(value) => Some(value),
                _ => None,
            },
        }
    }
}

/// A body run once per element, in the frame of the expression that
/// created it.
pub(crate) struct Stage {
    pub(crate) upstream: Streamable,
    pub(crate) body: Program,
    pub(crate) unit: Arc<ExpressionInner>,
    pub(crate) locals: Locals,
    /// Local slot receiving each element; `None` pushes a section frame.
    pub(crate) binding: Option<u32>,
}

impl Stage {
    fn run(&self, ctx: &mut RenderContext, item: Value, index: usize) -> EvalResult {
        if let Some(slot) = self.binding {
            if let Some(local) = self.locals.lock().get_mut(slot as usize) {
                *local = item;
            }
            return (self.body)(&mut Scope {
                ctx,
                unit: &self.unit,
                locals: &self.locals,
            });
        }
        ctx.push_stream_element(item, index, self.upstream.clone());
        let result = (self.body)(&mut Scope {
            ctx: &mut *ctx,
            unit: &self.unit,
            locals: &self.locals,
        });
        ctx.pop_section();
        result
    }

    /// Drive the upstream to the end; the last body value, or null when
    /// the sequence is empty.
    pub(crate) fn reduce(&self, ctx: &mut RenderContext) -> EvalResult {
        let mut last = Value::Null;
        let mut index = 0;
        while let Some(item) = self.upstream.next(ctx)? {
            last = self.run(ctx, item, index)?;
            index += 1;
        }
        Ok(last)
    }

    /// The first non-null body value; pulls nothing after it.
    pub(crate) fn first(&self, ctx: &mut RenderContext) -> EvalResult {
        let mut index = 0;
        while let Some(item) = self.upstream.next(ctx)? {
            let result = self.run(ctx, item, index)?;
            if !result.is_null() {
                return Ok(result);
            }
            index += 1;
        }
        Ok(Value::Null)
    }
}

impl Streamable {
    fn with_kind(kind: Kind, source: Source) -> Self {
        Streamable(Arc::new(StreamInner {
            kind,
            state: Mutex::new(State {
                source,
                ..State::default()
            }),
        }))
    }

    /// Adapt any value to a sequence. A stream is returned as is.
    pub fn from_value(value: Value) -> Self {
        let source = match value {
            Value::Stream(stream) => return stream,
            Value::Null => Source::Empty,
            Value::List(items) => Source::List { items, next: 0 },
            Value::Set(items) => Source::Values(items.iter().cloned().collect::<Vec<_>>().into_iter()),
            Value::Map(entries) => Source::Values(
                entries
                    .iter()
                    .map(|(key, value)| entry(key.clone(), value.clone()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            Value::Range(range) => range_source(range),
            Value::Object(object) => match object.host_type().iterate(&object) {
                Some(items) => Source::Values(items.into_iter()),
                None => Source::Single(Value::Object(object)),
            },
            other => Source::Single(other),
        };
        Self::with_kind(Kind::Source, source)
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self::with_kind(Kind::Source, Source::Values(values.into_iter()))
    }

    pub(crate) fn remap(stage: Stage) -> Self {
        Self::with_kind(Kind::Map(stage), Source::Empty)
    }

    pub(crate) fn filter(stage: Stage) -> Self {
        Self::with_kind(Kind::Filter(stage), Source::Empty)
    }

    pub(crate) fn flat_remap(stage: Stage) -> Self {
        Self::with_kind(Kind::FlatMap(stage), Source::Empty)
    }

    /// Pull the next element.
    pub fn next(&self, ctx: &mut RenderContext) -> Result<Option<Value>, EvalError> {
        let peeked = self.0.state.lock().peeked.take();
        if peeked.is_some() {
            return Ok(peeked);
        }
        self.pull(ctx)
    }

    /// Whether another element follows. Pulls one element ahead.
    pub fn has_next(&self, ctx: &mut RenderContext) -> Result<bool, EvalError> {
        if self.0.state.lock().peeked.is_some() {
            return Ok(true);
        }
        let next = self.pull(ctx)?;
        let found = next.is_some();
        self.0.state.lock().peeked = next;
        Ok(found)
    }

    /// Drain the remaining elements.
    pub fn collect(&self, ctx: &mut RenderContext) -> Result<Vec<Value>, EvalError> {
        let mut items = Vec::new();
        while let Some(item) = self.next(ctx)? {
            items.push(item);
        }
        Ok(items)
    }

    /// Identity of the shared cursor.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    fn advance(&self) -> usize {
        let mut state = self.0.state.lock();
        let index = state.pulled;
        state.pulled += 1;
        index
    }

    fn pull(&self, ctx: &mut RenderContext) -> Result<Option<Value>, EvalError> {
        match &self.0.kind {
            Kind::Source => Ok(self.0.state.lock().source.next()),
            Kind::Map(stage) => {
                let Some(item) = stage.upstream.next(ctx)? else {
                    return Ok(None);
                };
                let index = self.advance();
                stage.run(ctx, item, index).map(Some)
            }
            Kind::Filter(stage) => loop {
                let Some(item) = stage.upstream.next(ctx)? else {
                    return Ok(None);
                };
                let index = self.advance();
                if stage.run(ctx, item.clone(), index)?.is_truthy() {
                    return Ok(Some(item));
                }
            },
            Kind::FlatMap(stage) => loop {
                let current = self.0.state.lock().inner.clone();
                if let Some(inner) = current {
                    if let Some(item) = inner.next(ctx)? {
                        return Ok(Some(item));
                    }
                    self.0.state.lock().inner = None;
                }
                let Some(item) = stage.upstream.next(ctx)? else {
                    return Ok(None);
                };
                let index = self.advance();
                let produced = stage.run(ctx, item, index)?;
                self.0.state.lock().inner = Some(Streamable::from_value(produced));
            },
        }
    }
}

impl fmt::Debug for Streamable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.0.kind {
            Kind::Source => "source",
            Kind::Map(_) => "remap",
            Kind::Filter(_) => "filter",
            Kind::FlatMap(_) => "flat-remap",
        };
        write!(f, "Streamable({kind})")
    }
}

fn range_source(range: RangeValue) -> Source {
    match range.bounds() {
        Some((first, last)) => Source::Range { next: first, last },
        None => Source::Empty,
    }
}

fn entry(key: Value, value: Value) -> Value {
    Value::map([(Value::string("key"), key), (Value::string("value"), value)])
}
