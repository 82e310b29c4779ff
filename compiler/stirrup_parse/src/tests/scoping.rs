use pretty_assertions::assert_eq;
use stirrup_ir::{
    BinaryOp, Extensions, Literal, Lookup, Node, OutputMode, StreamOp, TemplateId,
};

use super::{error_kind, node, parse_in, Names};
use crate::{parse, ParseErrorKind, ParseState};

fn int(value: i64) -> Node {
    Node::Literal(Literal::Int(value))
}

// === Local bindings ===

#[test]
fn test_assignment_declares_local_slot() {
    let parsed = parse_in("x = 1; x + 1", &mut ParseState::new());
    assert_eq!(
        parsed.node,
        Node::Sequence(vec![
            Node::AssignLocal {
                slot: 0,
                value: Box::new(int(1)),
            },
            Node::binary(BinaryOp::Add, Node::Local(0), int(1)),
        ])
    );
    assert_eq!(parsed.local_count, 1);
    assert_eq!(parsed.output, OutputMode::Render);
}

#[test]
fn test_invalid_assignment_targets() {
    assert_eq!(error_kind("1 = 2"), ParseErrorKind::InvalidAssignmentTarget);
    assert_eq!(error_kind("a.b = 2"), ParseErrorKind::InvalidAssignmentTarget);
    assert_eq!(error_kind("a + b = 2"), ParseErrorKind::InvalidAssignmentTarget);
    assert_eq!(error_kind("(a) = 2"), ParseErrorKind::InvalidAssignmentTarget);
}

#[test]
fn test_stream_lambda_binds_local() {
    assert_eq!(
        node("[1, 2, 3] #> i -> i + 2"),
        Node::Stream {
            op: StreamOp::Remap,
            source: Box::new(Node::List(vec![int(1), int(2), int(3)])),
            binding: Some(0),
            body: Box::new(Node::binary(BinaryOp::Add, Node::Local(0), int(2))),
        }
    );
}

#[test]
fn test_stream_binding_ends_with_operator() {
    let Node::Sequence(items) = node("list #> i -> i; i") else {
        panic!("expected a sequence");
    };
    assert!(matches!(items[1], Node::Identifier { .. }));
}

#[test]
fn test_stream_without_binding_uses_section_value() {
    assert_eq!(
        node("list #? . > 1"),
        Node::Stream {
            op: StreamOp::Filter,
            source: Box::new(Node::Identifier {
                ident: 0,
                lookup: Lookup::Unstated,
            }),
            binding: None,
            body: Box::new(Node::binary(
                BinaryOp::Gt,
                Node::Current { backreach: 0 },
                int(1)
            )),
        }
    );
}

#[test]
fn test_reduce_assigns_outer_local() {
    let parsed = parse_in(
        "min = 1000000; [1, -1, 1000] #< i -> min = i < min ? i : min",
        &mut ParseState::new(),
    );
    let Node::Sequence(items) = parsed.node else {
        panic!("expected a sequence");
    };
    let Node::Stream {
        op: StreamOp::Reduce,
        binding: Some(1),
        body,
        ..
    } = &items[1]
    else {
        panic!("expected a reduce stream");
    };
    assert!(matches!(**body, Node::AssignLocal { slot: 0, .. }));
    assert_eq!(parsed.local_count, 2);
}

// === Template bindings ===

#[test]
fn test_template_binding_persists_across_tags() {
    let mut state = ParseState::<Names>::new();
    let declare = parse_in("count := 5", &mut state);
    assert_eq!(
        declare.node,
        Node::AssignBinding {
            template: TemplateId::ROOT,
            slot: 0,
            value: Box::new(int(5)),
        }
    );
    assert_eq!(declare.output, OutputMode::Discard);

    let read = parse_in("count + 1", &mut state);
    assert_eq!(
        read.node,
        Node::binary(
            BinaryOp::Add,
            Node::Binding {
                template: TemplateId::ROOT,
                slot: 0,
            },
            int(1)
        )
    );

    let assign = parse_in("count = 7", &mut state);
    assert!(matches!(assign.node, Node::AssignBinding { slot: 0, .. }));
    assert_eq!(assign.output, OutputMode::Render);
}

#[test]
fn test_nested_template_scopes() {
    let mut state = ParseState::<Names>::new();
    parse_in("outer := 1", &mut state);

    let partial = TemplateId(1);
    state.push_template_scope(partial);
    let inner = parse_in("inner := outer", &mut state);
    assert_eq!(
        inner.node,
        Node::AssignBinding {
            template: partial,
            slot: 0,
            value: Box::new(Node::Binding {
                template: TemplateId::ROOT,
                slot: 0,
            }),
        }
    );
    assert_eq!(state.pop_template_scope(), Some(partial));
    assert_eq!(state.pop_template_scope(), None);

    assert!(matches!(node_in("inner", &mut state), Node::Identifier { .. }));
    assert_eq!(state.binding_count(partial), 1);
    assert_eq!(state.binding_count(TemplateId::ROOT), 1);
}

fn node_in(text: &str, state: &mut ParseState<Names>) -> Node {
    parse_in(text, state).node
}

// === Named expressions ===

#[test]
fn test_recursive_definition() {
    let mut state = ParseState::<Names>::new();
    let fib = parse_in("fib -> . > 1 ? fib(. - 1) + fib(. - 2) : .", &mut state);
    assert_eq!(fib.name.as_deref(), Some("fib"));
    assert_eq!(fib.params, 0);
    let Node::Ternary { then, .. } = &fib.node else {
        panic!("expected a ternary body");
    };
    let Node::Binary { left, .. } = &**then else {
        panic!("expected an addition");
    };
    assert!(matches!(**left, Node::Recurse { ref args } if args.len() == 1));
    assert!(fib.expressions.is_empty());

    state.complete_definition("fib", "fib".to_owned());
    let call = parse_in("fib(5) + fib", &mut state);
    assert_eq!(
        call.node,
        Node::binary(
            BinaryOp::Add,
            Node::Named {
                target: 0,
                args: vec![int(5)],
            },
            Node::Named {
                target: 0,
                args: Vec::new(),
            }
        )
    );
    assert_eq!(call.expressions, vec!["fib".to_owned()]);
}

#[test]
fn test_definition_parameters_are_locals() {
    let mut state = ParseState::<Names>::new();
    let add = parse_in("add(a, b) => a + b", &mut state);
    assert_eq!(add.params, 2);
    assert_eq!(add.output, OutputMode::Discard);
    assert_eq!(
        add.node,
        Node::binary(BinaryOp::Add, Node::Local(0), Node::Local(1))
    );
}

#[test]
fn test_definition_errors() {
    assert_eq!(
        error_kind("f(a, a) -> a"),
        ParseErrorKind::DuplicateParameter { name: "a".into() }
    );

    let mut state = ParseState::<Names>::new();
    parse_in("f -> 1", &mut state);
    state.complete_definition("f", "f".to_owned());
    let duplicate = parse("f -> 2", 0, &mut state).unwrap_err();
    assert_eq!(
        duplicate.kind,
        ParseErrorKind::DuplicateDefinition { name: "f".into() }
    );
}

#[test]
fn test_failed_definition_releases_name() {
    let mut state = ParseState::<Names>::new();
    assert!(parse("g -> (", 0, &mut state).is_err());
    assert!(!state.is_named("g"));
    let retry = parse_in("g -> 1", &mut state);
    assert_eq!(retry.name.as_deref(), Some("g"));
}

// === Interpolation ===

#[test]
fn test_interpolated_string_becomes_concatenation() {
    assert_eq!(
        node(r#""Hi ${user.name}, $count new""#),
        Node::Concat(vec![
            Node::string("Hi "),
            Node::Member {
                receiver: Box::new(Node::Identifier {
                    ident: 0,
                    lookup: Lookup::Unstated,
                }),
                ident: 1,
                safe: false,
            },
            Node::string(", "),
            Node::Identifier {
                ident: 2,
                lookup: Lookup::Unstated,
            },
            Node::string(" new"),
        ])
    );
}

#[test]
fn test_interpolation_sees_enclosing_locals() {
    assert_eq!(
        node(r#"x = 2; "x=$x, y=${x * 2}""#),
        Node::Sequence(vec![
            Node::AssignLocal {
                slot: 0,
                value: Box::new(int(2)),
            },
            Node::Concat(vec![
                Node::string("x="),
                Node::Local(0),
                Node::string(", y="),
                Node::binary(BinaryOp::Mul, Node::Local(0), int(2)),
            ]),
        ])
    );
}

#[test]
fn test_single_quotes_and_disabled_interpolation_are_literal() {
    assert_eq!(node("'$x'"), Node::string("$x"));

    let mut state = ParseState::<Names>::with_extensions(Extensions::empty());
    assert_eq!(parse_in(r#""${x}""#, &mut state).node, Node::string("${x}"));
}

#[test]
fn test_interpolation_error_span_points_inside_string() {
    let err = parse(r#"  "a ${1 +}""#, 10, &mut ParseState::<Names>::new()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
    assert_eq!(err.span.start, 10 + 10);
}

// === Extensions ===

#[test]
fn test_disabled_extensions_are_rejected() {
    let mut state = ParseState::<Names>::with_extensions(Extensions::empty());
    assert_eq!(
        parse("@log", 0, &mut state).unwrap_err().kind,
        ParseErrorKind::ExtensionDisabled {
            feature: "annotations"
        }
    );
    assert_eq!(
        parse("x := 1", 0, &mut state).unwrap_err().kind,
        ParseErrorKind::ExtensionDisabled {
            feature: "template bindings"
        }
    );
    assert!(parse("f -> 1", 0, &mut state).is_err());
}

#[test]
fn test_annotation_call() {
    assert_eq!(
        node("@log('x', 1)"),
        Node::Annotation {
            name: "log".into(),
            args: vec![Node::string("x"), int(1)],
        }
    );
}
