use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use super::{compile, compile_in, eval, init_tracing};
use crate::{
    ExpressionCache, ExpressionCompiler, OutputMode, ParseErrorKind, RenderContext,
    TemplateParseState, Value,
};

// === Named expressions ===

#[test]
fn test_recursive_fibonacci() {
    init_tracing();
    let mut state = TemplateParseState::new();
    let fib = compile_in("fib -> . > 1 ? fib(. - 1) + fib(. - 2) : .", &mut state);
    assert_eq!(fib.name(), Some("fib"));
    assert!(state.is_named("fib"));

    let mut ctx = RenderContext::default();
    let expected = [0, 1, 1, 2, 3, 5];
    for (n, want) in expected.into_iter().enumerate() {
        let arg = Value::Int(i64::try_from(n).unwrap());
        assert_eq!(fib.evaluate(&mut ctx, &[arg]).unwrap(), Value::Int(want));
    }

    let call = compile_in("fib(10)", &mut state);
    assert_eq!(call.evaluate(&mut ctx, &[]).unwrap(), Value::Int(55));
}

#[test]
fn test_parameters_bind_in_order() {
    let mut state = TemplateParseState::new();
    let add = compile_in("add(a, b) => a + b", &mut state);
    assert_eq!(add.params(), 2);
    assert_eq!(add.output(), OutputMode::Discard);
    assert_eq!(add.call_name(), "add/2");

    let mut ctx = RenderContext::default();
    let call = compile_in("add(2, 3) * 10", &mut state);
    assert_eq!(call.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(50));
}

#[test]
fn test_first_argument_becomes_the_section() {
    let mut state = TemplateParseState::new();
    compile_in("label -> '<' + name + '>'", &mut state);
    let mut ctx = RenderContext::default();
    let call = compile_in("label(['name': 'x'])", &mut state);
    assert_eq!(call.try_evaluate(&mut ctx, &[]).unwrap(), Value::from("<x>"));
    // The section is popped again afterwards.
    assert_eq!(ctx.section_depth(), 1);
}

#[test]
fn test_zero_argument_call_keeps_the_current_section() {
    let mut state = TemplateParseState::new();
    compile_in("shout -> ./word + '!'", &mut state);
    let mut ctx = RenderContext::new(super::record(&[("word", Value::from("hey"))]));
    let call = compile_in("shout", &mut state);
    assert_eq!(call.try_evaluate(&mut ctx, &[]).unwrap(), Value::from("hey!"));
}

#[test]
fn test_locals_are_per_invocation() {
    let mut state = TemplateParseState::new();
    let counter = compile_in("bump(n) => x = n + 1; x", &mut state);
    let mut ctx = RenderContext::default();
    assert_eq!(counter.try_evaluate(&mut ctx, &[Value::Int(1)]).unwrap(), Value::Int(2));
    assert_eq!(counter.try_evaluate(&mut ctx, &[Value::Int(5)]).unwrap(), Value::Int(6));
    // Without an argument `n` is null and the addition fails.
    assert!(counter.try_evaluate(&mut ctx, &[]).is_err());
}

#[test]
fn test_local_assignment_and_sequence() {
    assert_eq!(eval("x = 2; x * 3"), Value::Int(6));
    assert_eq!(eval("x = 2; y = x + 1; [x, y]"), Value::list(vec![Value::Int(2), Value::Int(3)]));
}

// === Compilation ===

#[test]
fn test_call_name_is_trimmed_text() {
    assert_eq!(compile("  1 + 1 ").call_name(), "1 + 1");
    assert_eq!(compile("1 + 1").output(), OutputMode::Render);
}

#[test]
fn test_invalid_regex_literal_fails_compilation() {
    let mut state = TemplateParseState::new();
    let err = ExpressionCompiler::new()
        .compile("'a' =~ ~/(/", 40, &mut state)
        .unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidLiteral { .. }));
    assert!(err.span.start >= 40);
}

#[test]
fn test_failed_definition_can_be_redefined() {
    let mut state = TemplateParseState::new();
    let compiler = ExpressionCompiler::new();
    assert!(compiler.compile("bad -> ~/(/", 0, &mut state).is_err());
    assert!(!state.is_named("bad"));
    assert!(compiler.compile("bad -> 1", 0, &mut state).is_ok());
    assert!(state.is_named("bad"));
}

#[test]
fn test_parse_errors_surface_from_compile() {
    let err = ExpressionCompiler::new()
        .compile("1 +", 0, &mut TemplateParseState::new())
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
}

#[test]
fn test_dangling_operator_never_compiles() {
    let compiler = ExpressionCompiler::new();
    for text in ["[1, 2 + ]", "[1, f(2 + )]", "[1, f(-)]", "x * f(1 + )"] {
        let result = compiler.compile(text, 0, &mut TemplateParseState::new());
        assert!(
            matches!(result, Err(ref err) if matches!(err.kind, ParseErrorKind::UnexpectedToken { .. })),
            "{text} compiled"
        );
    }
    assert!(compiler.cache().is_empty());
}

#[test]
fn test_block_comments_are_ignored() {
    assert_eq!(eval("/* c */ 1"), Value::Int(1));
    assert_eq!(eval("1 + /* c */ 2"), Value::Int(3));
    assert_eq!(eval("1 /* c */ + 2 // tail"), Value::Int(3));
}

// === Program interning ===

#[test]
fn test_equal_ir_shares_one_program() {
    let compiler = ExpressionCompiler::new();
    let mut first = TemplateParseState::new();
    let mut second = TemplateParseState::new();

    let a = compiler.compile("a + 1", 0, &mut first).unwrap();
    let a_again = compiler.compile("a  +  1", 7, &mut second).unwrap();
    let b = compiler.compile("b + 1", 0, &mut first).unwrap();
    let different = compiler.compile("a + 2", 0, &mut first).unwrap();

    assert!(a.shares_program_with(&a_again));
    // Names live in the identifier table, not in the program.
    assert!(a.shares_program_with(&b));
    assert!(!a.shares_program_with(&different));
    assert_eq!(compiler.cache().len(), 2);
}

#[test]
fn test_shared_program_uses_each_expression_tables() {
    let compiler = ExpressionCompiler::new();
    let mut state = TemplateParseState::new();
    let a = compiler.compile("a + 1", 0, &mut state).unwrap();
    let b = compiler.compile("b + 1", 0, &mut state).unwrap();
    assert!(a.shares_program_with(&b));

    let mut ctx = RenderContext::new(super::record(&[("a", Value::Int(10)), ("b", Value::Int(20))]));
    assert_eq!(a.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(11));
    assert_eq!(b.try_evaluate(&mut ctx, &[]).unwrap(), Value::Int(21));
}

#[test]
fn test_concurrent_compiles_converge() {
    let cache = Arc::new(ExpressionCache::new());
    let compiled: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let compiler = ExpressionCompiler::with_cache(Arc::clone(&cache));
                scope.spawn(move || {
                    compiler
                        .compile("items #? i -> i.active", 0, &mut TemplateParseState::new())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    for expression in &compiled[1..] {
        assert!(compiled[0].shares_program_with(expression));
    }
}

#[test]
fn test_concurrent_renders_share_an_expression() {
    let expression = compile("n * 2");
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4_i64)
            .map(|n| {
                let expression = expression.clone();
                scope.spawn(move || {
                    let mut ctx = RenderContext::new(super::record(&[("n", Value::Int(n))]));
                    expression.try_evaluate(&mut ctx, &[]).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(
        results,
        vec![Value::Int(0), Value::Int(2), Value::Int(4), Value::Int(6)]
    );
}
