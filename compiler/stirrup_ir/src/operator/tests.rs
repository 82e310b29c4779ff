use super::*;
use std::collections::HashSet;

#[test]
fn test_tokens_are_unique_per_position() {
    let prefix: HashSet<_> = Operator::prefix_operators().iter().map(|op| op.token).collect();
    assert_eq!(prefix.len(), Operator::prefix_operators().len());

    let infix: HashSet<_> = Operator::infix_operators().iter().map(|op| op.token).collect();
    assert_eq!(infix.len(), Operator::infix_operators().len());
}

#[test]
fn test_minus_depends_on_position() {
    let unary = Operator::prefix("-").unwrap();
    let binary = Operator::infix("-").unwrap();

    assert_eq!(unary.kind, OpKind::Unary(UnaryOp::Negate));
    assert!(!unary.has_left());
    assert_eq!(binary.kind, OpKind::Binary(BinaryOp::Sub));
    assert!(binary.has_left());
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let add = Operator::infix("+").unwrap();
    let mul = Operator::infix("*").unwrap();

    // `2 * 3 + 4`: `*` on the stack must be applied before `+` is pushed.
    assert!(mul.yields_to(add));
    // `2 + 3 * 4`: `+` stays on the stack while `*` is pushed.
    assert!(!add.yields_to(mul));
}

#[test]
fn test_associativity_breaks_ties() {
    let sub = Operator::infix("-").unwrap();
    let pow = Operator::infix("**").unwrap();

    assert!(sub.yields_to(sub));
    assert!(!pow.yields_to(pow));
}

#[test]
fn test_containers_never_yield() {
    let group = Operator::prefix("(").unwrap();
    let lookup = Operator::infix("[").unwrap();
    let sequence = Operator::infix(";").unwrap();

    assert!(!group.yields_to(sequence));
    assert!(!lookup.yields_to(sequence));
    assert!(!Operator::call().yields_to(sequence));
}

#[test]
fn test_prefix_operators_never_force_a_pop() {
    let not = Operator::prefix("!").unwrap();
    let mul = Operator::infix("*").unwrap();
    assert!(!mul.yields_to(not));
}

#[test]
fn test_trailing_comma_only_for_calls_and_literals() {
    assert!(Operator::call().allows_trailing_comma());
    assert!(Operator::prefix("[").unwrap().allows_trailing_comma());
    assert!(Operator::prefix("{").unwrap().allows_trailing_comma());
    assert!(!Operator::prefix("(").unwrap().allows_trailing_comma());
    assert!(!Operator::infix("[").unwrap().allows_trailing_comma());
}

#[test]
fn test_streaming_operators_share_a_tier_below_assignment() {
    let assign = Operator::infix("=").unwrap();
    for token in ["#>", "#.", "#|", "#?", "#<", "#^"] {
        let op = Operator::infix(token).unwrap();
        assert!(op.is_streaming(), "{token}");
        assert!(assign.yields_to(op), "{token}");
    }
}

#[test]
fn test_navigation_flags() {
    assert!(Operator::infix(".").unwrap().is_navigation());
    let safe = Operator::infix("?.").unwrap();
    assert!(safe.is_navigation() && safe.is_safe());
    assert!(Operator::infix("?[").unwrap().is_safe());
}
