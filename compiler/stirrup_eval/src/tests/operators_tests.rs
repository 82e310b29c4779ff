use pretty_assertions::assert_eq;

use super::{eval, eval_err, eval_in, record};
use crate::{EvalErrorKind, RangeValue, RenderContext, Value};

fn with_root(entries: &[(&str, Value)]) -> RenderContext {
    RenderContext::new(record(entries))
}

// === Arithmetic ===

#[test]
fn test_precedence_and_associativity() {
    assert_eq!(eval("2 + 3 * 4"), Value::Int(14));
    assert_eq!(eval("2 * 3 + 4"), Value::Int(10));
    assert_eq!(eval("(2 + 3) * 4"), Value::Int(20));
    assert_eq!(eval("10 - 4 - 3"), Value::Int(3));
    // Exponentiation is right-associative and always floating.
    assert_eq!(eval("2 ** 3 ** 2"), Value::Double(512.0));
}

#[test]
fn test_integers_stay_integral_until_mixed() {
    assert_eq!(eval("7 * 6"), Value::Int(42));
    assert!(matches!(eval("7 * 6"), Value::Int(_)));
    assert!(matches!(eval("1 + 0.5"), Value::Double(d) if (d - 1.5).abs() < f64::EPSILON));
    assert_eq!(eval("7 / 2"), Value::Double(3.5));
    assert_eq!(eval("7 % 2"), Value::Double(1.0));
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = eval_err("9223372036854775807 + 1", &mut RenderContext::default());
    assert_eq!(
        err.kind,
        EvalErrorKind::IntegerOverflow {
            operation: "addition"
        }
    );
    let mut ctx = with_root(&[("n", Value::Int(i64::MAX))]);
    assert!(matches!(
        eval_err("n * 2", &mut ctx).kind,
        EvalErrorKind::IntegerOverflow {
            operation: "multiplication"
        }
    ));
}

#[test]
fn test_plus_concatenates_with_either_string_side() {
    assert_eq!(eval("'a' + 1"), Value::from("a1"));
    assert_eq!(eval("1 + 'a'"), Value::from("1a"));
    assert_eq!(eval("'x' + null"), Value::from("xnull"));
}

#[test]
fn test_arithmetic_rejects_non_numbers_at_runtime() {
    let mut ctx = with_root(&[("x", Value::from("a"))]);
    let err = eval_err("x - 1", &mut ctx);
    assert!(matches!(err.kind, EvalErrorKind::InvalidOperands { op: "-", .. }));
}

#[test]
fn test_unary_sign_coerces_to_floating() {
    let mut ctx = with_root(&[("i", Value::Int(3)), ("d", Value::Double(2.5))]);
    assert!(matches!(eval_in("-i", &mut ctx), Value::Double(_)));
    assert_eq!(eval_in("-i", &mut ctx), Value::Double(-3.0));
    assert!(matches!(eval_in("+i", &mut ctx), Value::Double(_)));
    assert_eq!(eval_in("-d", &mut ctx), Value::Double(-2.5));
    // Literals fold at compile time and keep their kind.
    assert!(matches!(eval("-3"), Value::Int(-3)));
    assert_eq!(eval("!0"), Value::Bool(true));
    assert_eq!(eval("!'text'"), Value::Bool(false));
}

// === Bitwise ===

#[test]
fn test_bitwise_operators() {
    assert_eq!(eval("6 & 3"), Value::Int(2));
    assert_eq!(eval("6 | 3"), Value::Int(7));
    assert_eq!(eval("6 ^ 3"), Value::Int(5));
    assert_eq!(eval("~5"), Value::Int(-6));
    assert_eq!(eval("1 << 4"), Value::Int(16));
    assert_eq!(eval("-16 >> 2"), Value::Int(-4));
    assert_eq!(eval("-1 >>> 60"), Value::Int(15));
}

#[test]
fn test_shift_distance_uses_low_six_bits() {
    assert_eq!(eval("1 << 65"), Value::Int(2));
}

#[test]
fn test_bitwise_needs_integral_operands() {
    let mut ctx = with_root(&[("whole", Value::Double(6.0)), ("x", Value::Double(1.5))]);
    assert_eq!(eval_in("whole & 3", &mut ctx), Value::Int(2));
    assert!(matches!(
        eval_err("x | 1", &mut ctx).kind,
        EvalErrorKind::InvalidOperands { op: "|", .. }
    ));
}

// === Comparison ===

#[test]
fn test_relational_operators() {
    assert_eq!(eval("1 < 2.5"), Value::Bool(true));
    assert_eq!(eval("3 >= 3"), Value::Bool(true));
    assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
    assert_eq!(eval("'b' <= 'a'"), Value::Bool(false));
}

#[test]
fn test_relational_on_unordered_values_is_an_error() {
    let mut ctx = with_root(&[("xs", Value::list(vec![Value::Int(1)]))]);
    assert!(matches!(
        eval_err("xs < 1", &mut ctx).kind,
        EvalErrorKind::Incomparable { .. }
    ));
}

#[test]
fn test_equality_is_structural_and_numeric() {
    assert_eq!(eval("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("[1, 2] == [1, 2]"), Value::Bool(true));
    assert_eq!(eval("['a': 1] != ['a': 2]"), Value::Bool(true));
    assert_eq!(eval("null == null"), Value::Bool(true));
}

#[test]
fn test_three_way_compare_orders_null_first() {
    assert_eq!(eval("1 <=> 2"), Value::Int(-1));
    assert_eq!(eval("2 <=> 2.0"), Value::Int(0));
    assert_eq!(eval("'b' <=> 'a'"), Value::Int(1));
    assert_eq!(eval("null <=> 1"), Value::Int(-1));
    assert_eq!(eval("1 <=> null"), Value::Int(1));
}

// === Regex ===

#[test]
fn test_find_and_full_match() {
    assert_eq!(eval("'hello' =~ ~/ll/"), Value::Bool(true));
    assert_eq!(eval("'hello' ==~ ~/ll/"), Value::Bool(false));
    assert_eq!(eval("'hello' ==~ ~/h.*o/"), Value::Bool(true));
    assert_eq!(eval("'abc' =~ 'b'"), Value::Bool(true));
    assert_eq!(eval("missing =~ ~/x/"), Value::Bool(false));
}

#[test]
fn test_invalid_runtime_pattern_is_an_error() {
    assert!(matches!(
        eval_err("'a' =~ '('", &mut RenderContext::default()).kind,
        EvalErrorKind::InvalidRegex { .. }
    ));
}

// === Ranges ===

#[test]
fn test_range_operators() {
    assert_eq!(eval("1..3"), Value::Range(RangeValue::new(1, 3, true)));
    assert_eq!(eval("(1..<4).size()"), Value::Int(3));
    assert_eq!(eval("(1..3).contains(3)"), Value::Bool(true));
    assert_eq!(eval("(1..<3).contains(3)"), Value::Bool(false));
    assert!(matches!(
        eval_err("1..'z'", &mut RenderContext::default()).kind,
        EvalErrorKind::InvalidOperands { .. }
    ));
}

// === Selection ===

#[test]
fn test_selection_operators() {
    assert_eq!(eval("null ?? 5"), Value::Int(5));
    assert_eq!(eval("0 ?? 5"), Value::Int(0));
    assert_eq!(eval("0 ?: 5"), Value::Int(5));
    assert_eq!(eval("5 ?: 0"), Value::Int(5));
    assert_eq!(eval("null !? 5"), Value::Null);
    assert_eq!(eval("4 !? 5"), Value::Int(5));
    assert_eq!(eval("1 !: 2"), Value::Int(2));
    assert_eq!(eval("0 !: 2"), Value::Int(0));
}

#[test]
fn test_lazy_operators_skip_the_unselected_side() {
    // `missing.name` would fail on a null receiver if it ran.
    assert_eq!(eval("false && missing.name"), Value::Bool(false));
    assert_eq!(eval("true || missing.name"), Value::Bool(true));
    assert_eq!(eval("1 ?? missing.name"), Value::Int(1));
    assert_eq!(eval("true ? 1 : missing.name"), Value::Int(1));
}

#[test]
fn test_truthiness() {
    for (text, truthy) in [
        ("null", false),
        ("0", false),
        ("0.0", false),
        ("''", false),
        ("[]", false),
        ("[:]", false),
        ("{}", false),
        ("1", true),
        ("'0'", true),
        ("[0]", true),
    ] {
        let expected = Value::from(if truthy { "y" } else { "n" });
        assert_eq!(eval(&format!("{text} ? 'y' : 'n'")), expected, "{text}");
    }
}

// === Indexing and member access ===

#[test]
fn test_index_access() {
    assert_eq!(eval("[10, 20][1]"), Value::Int(20));
    assert_eq!(eval("['a': 1]['a']"), Value::Int(1));
    assert_eq!(eval("['a': 1]['b']"), Value::Null);
    assert_eq!(eval("'abc'[1]"), Value::from("b"));
    assert_eq!(
        eval_err("[10][5]", &mut RenderContext::default()).kind,
        EvalErrorKind::IndexOutOfBounds { index: 5, len: 1 }
    );
}

#[test]
fn test_null_receivers() {
    assert_eq!(eval("missing?.name"), Value::Null);
    assert_eq!(eval("missing?[0]"), Value::Null);
    assert_eq!(eval("missing?.trim()"), Value::Null);
    assert_eq!(
        eval_err("missing.name", &mut RenderContext::default()).kind,
        EvalErrorKind::NullReceiver {
            member: "name".into()
        }
    );
    assert!(matches!(
        eval_err("missing[0]", &mut RenderContext::default()).kind,
        EvalErrorKind::CannotIndex { .. }
    ));
}

#[test]
fn test_containers_and_interpolation() {
    assert_eq!(
        eval("[1, 'two', 3.0]"),
        Value::list(vec![Value::Int(1), Value::from("two"), Value::Double(3.0)])
    );
    assert_eq!(eval("{2, 1, 2}").to_string(), "{1, 2}");
    assert_eq!(eval("[1: 'one']").to_string(), "[1: one]");
    let mut ctx = with_root(&[
        ("user", record(&[("name", Value::from("Ada"))])),
        ("count", Value::Int(3)),
    ]);
    assert_eq!(
        eval_in(r#""Hi ${user.name}, $count!""#, &mut ctx),
        Value::from("Hi Ada, 3!")
    );
}

#[test]
fn test_halt_carries_its_message() {
    let err = eval_err("☠ 'stop here'", &mut RenderContext::default());
    assert!(err.is_halt());
    assert_eq!(
        err.kind,
        EvalErrorKind::Halt {
            message: "stop here".into()
        }
    );
}
