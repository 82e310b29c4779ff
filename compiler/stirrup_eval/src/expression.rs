//! Compiled expressions.
//!
//! A [`CompiledExpression`] pairs a shared, immutable program with the
//! tables of one occurrence in a template: its interned identifiers and the
//! named expressions it calls. It holds no render state and can be
//! evaluated by any number of renders at once.

use std::sync::Arc;

use parking_lot::Mutex;
use stirrup_ir::{OutputMode, Span};
use stirrup_stack::ensure_sufficient_stack;

use crate::error_handler::ErrorReport;
use crate::identifier::Identifier;
use crate::lower::{Program, Scope};
use crate::{EvalResult, RenderContext, Value};

/// Local slots of one running invocation.
pub(crate) type Locals = Arc<Mutex<Vec<Value>>>;

/// A lowered program, shared by every expression with an equal IR.
pub(crate) struct Executable {
    pub(crate) program: Program,
}

pub(crate) struct ExpressionInner {
    pub(crate) name: Option<Box<str>>,
    pub(crate) call_name: Box<str>,
    pub(crate) span: Span,
    pub(crate) params: u32,
    pub(crate) local_count: u32,
    pub(crate) output: OutputMode,
    pub(crate) identifiers: Vec<Arc<Identifier>>,
    pub(crate) expressions: Vec<CompiledExpression>,
    pub(crate) executable: Arc<Executable>,
}

#[derive(Clone)]
pub struct CompiledExpression(Arc<ExpressionInner>);

impl CompiledExpression {
    pub(crate) fn new(inner: ExpressionInner) -> Self {
        CompiledExpression(Arc::new(inner))
    }

    /// Name of a named-expression definition.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Human-readable label used in error reports.
    pub fn call_name(&self) -> &str {
        &self.0.call_name
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.0.span
    }

    /// Whether the result is meant to be written to the output.
    #[inline]
    pub fn output(&self) -> OutputMode {
        self.0.output
    }

    #[inline]
    pub fn params(&self) -> u32 {
        self.0.params
    }

    pub fn identifiers(&self) -> &[Arc<Identifier>] {
        &self.0.identifiers
    }

    /// Whether both expressions run the same lowered program.
    pub fn shares_program_with(&self, other: &CompiledExpression) -> bool {
        Arc::ptr_eq(&self.0.executable, &other.0.executable)
    }

    /// Evaluate with failure isolation.
    ///
    /// A halt is returned as `Err` and must abort the render. Any other
    /// error is reported to the context's error handler and the result is
    /// null. Successful results pass through the context's result hook.
    pub fn evaluate(&self, ctx: &mut RenderContext, args: &[Value]) -> EvalResult {
        match self.try_evaluate(ctx, args) {
            Ok(value) => Ok(ctx.finish(value)),
            Err(error) if error.is_halt() => Err(error),
            Err(error) => {
                ctx.report(ErrorReport {
                    expression: self.0.call_name.to_string(),
                    span: error.span.unwrap_or(self.0.span),
                    error,
                });
                Ok(Value::Null)
            }
        }
    }

    /// Evaluate without isolation: every error is returned as is.
    ///
    /// Arguments bind to the declared parameters in order; missing ones
    /// are null. With at least one argument, the first is pushed as the
    /// current section for the duration of the call.
    pub fn try_evaluate(&self, ctx: &mut RenderContext, args: &[Value]) -> EvalResult {
        invoke(&self.0, ctx, args)
    }
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("call_name", &self.0.call_name)
            .field("span", &self.0.span)
            .finish_non_exhaustive()
    }
}

pub(crate) fn invoke(unit: &Arc<ExpressionInner>, ctx: &mut RenderContext, args: &[Value]) -> EvalResult {
    ctx.enter_call()?;
    let mut slots = vec![Value::Null; unit.local_count as usize];
    for (slot, arg) in slots.iter_mut().zip(args.iter().take(unit.params as usize)) {
        *slot = arg.clone();
    }
    let locals: Locals = Arc::new(Mutex::new(slots));

    let section = args.first().cloned();
    let pushed = section.is_some();
    if let Some(first) = section {
        ctx.push_section(first);
    }
    let result = ensure_sufficient_stack(|| {
        (unit.executable.program)(&mut Scope {
            ctx: &mut *ctx,
            unit,
            locals: &locals,
        })
    });
    if pushed {
        ctx.pop_section();
    }
    ctx.exit_call();
    result.map_err(|error| error.with_span(unit.span))
}
