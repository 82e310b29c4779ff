//! End-to-end tests: compile expression text, evaluate it against a
//! render context.
//!
//! - `operators_tests`: arithmetic, comparison, selection, indexing
//! - `context_tests`: sections, backreach, bindings, isolation, hooks
//! - `stream_tests`: the five streaming operators
//! - `resolver_tests`: identifier resolution and host types
//! - `expression_tests`: named expressions, recursion, interning

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod context_tests;
mod expression_tests;
mod operators_tests;

use crate::{
    CompiledExpression, EvalError, ExpressionCompiler, RenderContext, TemplateParseState, Value,
};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub(crate) fn compile_in(text: &str, state: &mut TemplateParseState) -> CompiledExpression {
    match ExpressionCompiler::new().compile(text, 0, state) {
        Ok(expression) => expression,
        Err(error) => panic!("failed to compile {text:?}: {error}"),
    }
}

pub(crate) fn compile(text: &str) -> CompiledExpression {
    compile_in(text, &mut TemplateParseState::new())
}

pub(crate) fn eval_in(text: &str, ctx: &mut RenderContext) -> Value {
    match compile(text).try_evaluate(ctx, &[]) {
        Ok(value) => value,
        Err(error) => panic!("failed to evaluate {text:?}: {error}"),
    }
}

pub(crate) fn eval(text: &str) -> Value {
    eval_in(text, &mut RenderContext::default())
}

pub(crate) fn eval_err(text: &str, ctx: &mut RenderContext) -> EvalError {
    match compile(text).try_evaluate(ctx, &[]) {
        Ok(value) => panic!("expected {text:?} to fail, got {value}"),
        Err(error) => error,
    }
}

/// Drain a stream result; other values are returned as a single element.
pub(crate) fn drain(value: Value, ctx: &mut RenderContext) -> Vec<Value> {
    match value {
        Value::Stream(stream) => stream.collect(ctx).unwrap(),
        other => vec![other],
    }
}

pub(crate) fn record(entries: &[(&str, Value)]) -> Value {
    Value::map(
        entries
            .iter()
            .map(|(key, value)| (Value::from(*key), value.clone())),
    )
}

pub(crate) fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}
