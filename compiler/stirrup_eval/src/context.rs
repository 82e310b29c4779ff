//! Per-render mutable state.
//!
//! Compiled expressions are immutable and shared; everything that changes
//! while a template renders lives in a [`RenderContext`]:
//! - the section stack (the value of each nested section plus iteration
//!   metadata), searched by identifier lookups
//! - template-binding frames, one per active template activation
//! - annotation handlers, the error handler and the result hook
//!
//! A fresh context starts with the root data as its only section frame and
//! one template frame for `TemplateId::ROOT`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use stirrup_ir::{InternalName, Lookup, TemplateId};
use stirrup_stack::Stack;

use crate::error_handler::{log_handler, ErrorReport, SharedErrorHandler};
use crate::errors::{no_template_frame, recursion_limit};
use crate::identifier::Identifier;
use crate::streamable::Streamable;
use crate::{EvalError, EvalResult, Value};

/// Handler invoked by `@name` / `@name(args)`.
pub type AnnotationHandler = Arc<dyn Fn(&mut RenderContext, &[Value]) -> EvalResult + Send + Sync>;

/// Post-processing applied to each successful top-level result.
pub type ResultHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Named-expression calls nested deeper than this fail.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

#[derive(Clone, Debug)]
enum HasNext {
    Known(bool),
    /// Decided by peeking the sequence being iterated.
    Stream(Streamable),
}

/// One level of section nesting.
#[derive(Clone, Debug)]
pub struct SectionFrame {
    value: Value,
    /// Position within the enclosing iteration, if any.
    index: Option<usize>,
    has_next: HasNext,
}

impl SectionFrame {
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

#[derive(Debug)]
struct TemplateFrame {
    template: TemplateId,
    slots: Vec<Value>,
}

pub struct RenderContext {
    sections: Stack<SectionFrame>,
    templates: Stack<TemplateFrame>,
    annotations: FxHashMap<Box<str>, AnnotationHandler>,
    error_handler: SharedErrorHandler,
    result_hook: Option<ResultHook>,
    call_depth: usize,
    max_call_depth: usize,
}

impl RenderContext {
    pub fn new(root: Value) -> Self {
        let mut sections = Stack::new();
        sections.push(SectionFrame {
            value: root,
            index: None,
            has_next: HasNext::Known(false),
        });
        let mut templates = Stack::new();
        templates.push(TemplateFrame {
            template: TemplateId::ROOT,
            slots: Vec::new(),
        });
        RenderContext {
            sections,
            templates,
            annotations: FxHashMap::default(),
            error_handler: log_handler(),
            result_hook: None,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: SharedErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    #[must_use]
    pub fn with_result_hook(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.result_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn register_annotation(
        &mut self,
        name: &str,
        handler: impl Fn(&mut RenderContext, &[Value]) -> EvalResult + Send + Sync + 'static,
    ) {
        self.annotations.insert(name.into(), Arc::new(handler));
    }

    #[inline]
    pub fn error_handler(&self) -> &SharedErrorHandler {
        &self.error_handler
    }

    // === Section stack ===

    /// Enter a section whose value is not part of an iteration.
    pub fn push_section(&mut self, value: Value) {
        self.sections.push(SectionFrame {
            value,
            index: None,
            has_next: HasNext::Known(false),
        });
    }

    /// Enter one element of an iteration.
    pub fn push_iteration(&mut self, value: Value, index: usize, has_next: bool) {
        self.sections.push(SectionFrame {
            value,
            index: Some(index),
            has_next: HasNext::Known(has_next),
        });
    }

    pub(crate) fn push_stream_element(&mut self, value: Value, index: usize, source: Streamable) {
        self.sections.push(SectionFrame {
            value,
            index: Some(index),
            has_next: HasNext::Stream(source),
        });
    }

    pub fn pop_section(&mut self) -> Option<Value> {
        self.sections.pop().map(|frame| frame.value)
    }

    #[inline]
    pub fn section_depth(&self) -> usize {
        self.sections.len()
    }

    /// The innermost section frame.
    pub fn current(&self) -> Option<&SectionFrame> {
        self.sections.peek()
    }

    /// Frame selected by a lookup prefix. Unstated selects the innermost.
    pub(crate) fn frame(&self, lookup: Lookup) -> Option<&SectionFrame> {
        match lookup {
            Lookup::Unstated => self.sections.peek(),
            Lookup::Backreach(levels) => self.sections.peek_at(levels as usize),
            Lookup::Root => self.sections.peek_base(0),
        }
    }

    /// `.`, `..`, `../..`: null when the nesting is not that deep.
    pub(crate) fn section_value(&self, backreach: u32) -> Value {
        self.sections
            .peek_at(backreach as usize)
            .map_or(Value::Null, |frame| frame.value.clone())
    }

    /// `.index`, `.isFirst`, `.hasNext` of the selected frame.
    pub(crate) fn internal(&mut self, lookup: Lookup, name: InternalName) -> EvalResult {
        let Some(frame) = self.frame(lookup) else {
            return Ok(Value::Null);
        };
        match name {
            InternalName::Index => Ok(frame
                .index
                .map_or(Value::Null, |i| Value::Int(i64::try_from(i).unwrap_or(i64::MAX)))),
            InternalName::IsFirst => Ok(Value::Bool(frame.index == Some(0))),
            InternalName::HasNext => match frame.has_next.clone() {
                HasNext::Known(has_next) => Ok(Value::Bool(has_next)),
                HasNext::Stream(source) => source.has_next(self).map(Value::Bool),
            },
        }
    }

    /// Resolve `identifier` against the frames `lookup` selects. Unstated
    /// lookups search outward and stop at the first frame that resolves.
    pub(crate) fn resolve(&self, identifier: &Identifier, lookup: Lookup, args: &[Value]) -> Value {
        let found = match lookup {
            Lookup::Unstated => self
                .sections
                .iter()
                .find_map(|frame| identifier.get(&frame.value, args)),
            Lookup::Backreach(_) | Lookup::Root => self
                .frame(lookup)
                .and_then(|frame| identifier.get(&frame.value, args)),
        };
        found.unwrap_or(Value::Null)
    }

    // === Template bindings ===

    /// Enter an activation of template `id`, with all its bindings unset.
    pub fn push_template_frame(&mut self, id: TemplateId) {
        self.templates.push(TemplateFrame {
            template: id,
            slots: Vec::new(),
        });
    }

    pub fn pop_template_frame(&mut self) -> Option<TemplateId> {
        self.templates.pop().map(|frame| frame.template)
    }

    /// Current value of a binding; null when unset or without a frame.
    pub fn binding(&self, id: TemplateId, slot: u32) -> Value {
        self.templates
            .iter()
            .find(|frame| frame.template == id)
            .and_then(|frame| frame.slots.get(slot as usize))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Assign a binding in the innermost activation of `id`.
    pub fn set_binding(&mut self, id: TemplateId, slot: u32, value: Value) -> Result<(), EvalError> {
        let Some(frame) = self
            .templates
            .iter_mut()
            .find(|frame| frame.template == id)
        else {
            return Err(no_template_frame(id));
        };
        let slot = slot as usize;
        if frame.slots.len() <= slot {
            frame.slots.resize(slot + 1, Value::Null);
        }
        frame.slots[slot] = value;
        Ok(())
    }

    // === Evaluation plumbing ===

    pub(crate) fn annotation(&self, name: &str) -> Option<AnnotationHandler> {
        self.annotations.get(name).cloned()
    }

    pub(crate) fn enter_call(&mut self) -> Result<(), EvalError> {
        if self.call_depth >= self.max_call_depth {
            return Err(recursion_limit(self.max_call_depth));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub(crate) fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub(crate) fn report(&self, report: ErrorReport) {
        self.error_handler.handle(report);
    }

    pub(crate) fn finish(&self, value: Value) -> Value {
        match &self.result_hook {
            Some(hook) => hook(value),
            None => value,
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}
