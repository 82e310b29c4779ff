use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::{compile, compile_in, drain, eval_err, eval_in, ints, record};
use crate::{
    buffer_handler, custom_handler, EvalErrorKind, RenderContext, TemplateId, TemplateParseState,
    Value,
};

fn nested() -> RenderContext {
    let a = record(&[("name", Value::from("A")), ("level", Value::Int(1))]);
    let b = record(&[("level", Value::Int(2))]);
    let c = record(&[("level", Value::Int(3))]);
    let mut ctx = RenderContext::new(record(&[("title", Value::from("root"))]));
    ctx.push_section(a);
    ctx.push_section(b);
    ctx.push_section(c);
    ctx
}

// === Sections and backreach ===

#[test]
fn test_backreach_selects_enclosing_sections() {
    let mut ctx = nested();
    assert_eq!(eval_in("./level", &mut ctx), Value::Int(3));
    assert_eq!(eval_in("../level", &mut ctx), Value::Int(2));
    assert_eq!(eval_in("../../level", &mut ctx), Value::Int(1));
    assert_eq!(eval_in("..", &mut ctx), record(&[("level", Value::Int(2))]));
}

#[test]
fn test_unstated_names_search_outward() {
    let mut ctx = nested();
    // `level` is found on the innermost frame, `name` only on A.
    assert_eq!(eval_in("level", &mut ctx), Value::Int(3));
    assert_eq!(eval_in("name", &mut ctx), Value::from("A"));
    assert_eq!(eval_in("title", &mut ctx), Value::from("root"));
    assert_eq!(eval_in("nowhere", &mut ctx), Value::Null);
}

#[test]
fn test_root_lookup_and_too_deep_backreach() {
    let mut ctx = nested();
    assert_eq!(eval_in("/title", &mut ctx), Value::from("root"));
    assert_eq!(eval_in("/level", &mut ctx), Value::Null);
    assert_eq!(eval_in("../../../..", &mut ctx), Value::Null);
}

#[test]
fn test_pop_section_restores_the_outer_frame() {
    let mut ctx = nested();
    assert_eq!(ctx.section_depth(), 4);
    ctx.pop_section();
    assert_eq!(eval_in("level", &mut ctx), Value::Int(2));
    assert_eq!(ctx.section_depth(), 3);
}

#[test]
fn test_iteration_internals() {
    let mut ctx = RenderContext::default();
    ctx.push_iteration(Value::from("first"), 0, true);
    assert_eq!(eval_in(".index", &mut ctx), Value::Int(0));
    assert_eq!(eval_in(".isFirst", &mut ctx), Value::Bool(true));
    assert_eq!(eval_in(".hasNext", &mut ctx), Value::Bool(true));

    ctx.push_iteration(Value::from("inner"), 2, false);
    assert_eq!(eval_in(".index", &mut ctx), Value::Int(2));
    assert_eq!(eval_in(".hasNext", &mut ctx), Value::Bool(false));
    assert_eq!(eval_in("../.index", &mut ctx), Value::Int(0));
}

#[test]
fn test_internals_outside_an_iteration() {
    let mut ctx = RenderContext::default();
    assert_eq!(eval_in(".index", &mut ctx), Value::Null);
    assert_eq!(eval_in(".isFirst", &mut ctx), Value::Bool(false));
}

#[test]
fn test_stream_elements_expose_internals() {
    let mut ctx = RenderContext::default();
    let indexes = eval_in("[5, 6, 7] #> .index", &mut ctx);
    assert_eq!(drain(indexes, &mut ctx), ints(&[0, 1, 2]));

    let has_next = eval_in("[5, 6, 7] #> .hasNext", &mut ctx);
    assert_eq!(
        drain(has_next, &mut ctx),
        vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)]
    );
}

// === Template bindings ===

#[test]
fn test_bindings_persist_across_expressions() {
    let mut state = TemplateParseState::new();
    let declare = compile_in("count := 5", &mut state);
    let read = compile_in("count + 1", &mut state);
    let assign = compile_in("count = 7", &mut state);

    let mut ctx = RenderContext::default();
    assert_eq!(declare.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(5));
    assert_eq!(read.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(6));
    assert_eq!(assign.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(7));
    assert_eq!(read.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(8));
}

#[test]
fn test_bindings_are_per_activation() {
    let mut state = TemplateParseState::new();
    let declare = compile_in("count := 5", &mut state);
    let read = compile_in("count", &mut state);

    let mut ctx = RenderContext::default();
    declare.try_evaluate(&mut ctx, &[]).unwrap();

    // A recursive activation of the same template starts unset.
    ctx.push_template_frame(TemplateId::ROOT);
    assert_eq!(read.try_evaluate(&mut ctx, &[]).unwrap(), Value::Null);
    declare.try_evaluate(&mut ctx, &[]).unwrap();
    assert_eq!(ctx.pop_template_frame(), Some(TemplateId::ROOT));

    assert_eq!(read.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(5));
}

#[test]
fn test_binding_without_a_frame_is_an_error() {
    let declare = compile("count := 1");
    let mut ctx = RenderContext::default();
    ctx.pop_template_frame();
    let err = declare.try_evaluate(&mut ctx, &[]).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::NoTemplateFrame {
            template: TemplateId::ROOT
        }
    );
}

// === Annotations ===

#[test]
fn test_annotations_call_registered_handlers() {
    let mut ctx = RenderContext::default();
    ctx.register_annotation("upper", |_, args| {
        Ok(args
            .first()
            .and_then(Value::as_str)
            .map_or(Value::Null, |s| Value::from(s.to_uppercase())))
    });
    assert_eq!(eval_in("@upper('shout')", &mut ctx), Value::from("SHOUT"));
    assert_eq!(eval_in("@unknown(1)", &mut ctx), Value::Null);
}

#[test]
fn test_annotation_handlers_see_the_context() {
    let mut ctx = RenderContext::new(Value::from("root value"));
    ctx.register_annotation("depth", |ctx, _| {
        Ok(Value::Int(i64::try_from(ctx.section_depth()).unwrap_or(0)))
    });
    ctx.push_section(Value::Null);
    assert_eq!(eval_in("@depth", &mut ctx), Value::Int(2));
}

// === Failure isolation ===

#[test]
fn test_errors_are_isolated_per_expression() {
    let handler = buffer_handler();
    let mut ctx = RenderContext::new(record(&[("x", Value::from("a")), ("y", Value::Int(1))]))
        .with_error_handler(Arc::clone(&handler));

    let failing = compile("x - 1");
    let passing = compile("y + 1");
    assert_eq!(failing.evaluate(&mut ctx, &[]).unwrap(), Value::Null);
    assert_eq!(passing.evaluate(&mut ctx, &[]).unwrap(), Value::Int(2));

    let reports = handler.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].expression, "x - 1");
    assert!(matches!(
        reports[0].error.kind,
        EvalErrorKind::InvalidOperands { .. }
    ));
}

#[test]
fn test_halt_escapes_isolation() {
    let handler = buffer_handler();
    let mut ctx = RenderContext::default().with_error_handler(Arc::clone(&handler));
    let err = compile("☠ 'abort'").evaluate(&mut ctx, &[]).unwrap_err();
    assert!(err.is_halt());
    assert!(handler.reports().is_empty());
}

#[test]
fn test_halt_inside_a_stream_body_escapes() {
    let mut ctx = RenderContext::default();
    let err = eval_err("[1, 2] #< i -> i > 1 ? ☠ 'two' : i", &mut ctx);
    assert_eq!(
        err.kind,
        EvalErrorKind::Halt {
            message: "two".into()
        }
    );
}

#[test]
fn test_custom_handler_receives_reports() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = custom_handler(move |report| sink.lock().push(report.expression.clone()));
    let mut ctx = RenderContext::default().with_error_handler(handler);
    compile("missing.name").evaluate(&mut ctx, &[]).unwrap();
    assert_eq!(*seen.lock(), vec!["missing.name".to_string()]);
}

#[test]
fn test_recursion_limit_is_isolated() {
    let handler = buffer_handler();
    let mut state = TemplateParseState::new();
    let looping = compile_in("spin -> spin(1)", &mut state);
    let mut ctx = RenderContext::default()
        .with_error_handler(Arc::clone(&handler))
        .with_max_call_depth(16);

    assert_eq!(looping.evaluate(&mut ctx, &[]).unwrap(), Value::Null);
    let reports = handler.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].error.kind,
        EvalErrorKind::RecursionLimit { limit: 16 }
    );
    // The depth counter unwinds, so the context stays usable.
    assert_eq!(eval_in("1 + 1", &mut ctx), Value::Int(2));
}

// === Result hook ===

#[test]
fn test_result_hook_post_processes_evaluate() {
    let mut ctx = RenderContext::default().with_result_hook(|value| match value {
        Value::Str(s) => Value::from(s.to_uppercase()),
        other => other,
    });
    let expression = compile("'quiet'");
    assert_eq!(expression.evaluate(&mut ctx, &[]).unwrap(), Value::from("QUIET"));
    assert_eq!(
        expression.try_evaluate(&mut ctx, &[]).unwrap(),
        Value::from("quiet")
    );
    assert_eq!(compile("41 + 1").evaluate(&mut ctx, &[]).unwrap(), Value::Int(42));
}
