use super::Stack;
use pretty_assertions::assert_eq;

#[test]
fn test_push_pop_order() {
    let mut stack = Stack::new();
    stack.push(1);
    stack.push(2);
    stack.push(3);

    assert_eq!(stack.len(), 3);
    assert_eq!(stack.pop(), Some(3));
    assert_eq!(stack.pop(), Some(2));
    assert_eq!(stack.pop(), Some(1));
    assert_eq!(stack.pop(), None);
    assert!(stack.is_empty());
}

#[test]
fn test_peek_from_top_and_bottom() {
    let stack: Stack<&str> = ["a", "b", "c"].into_iter().collect();

    assert_eq!(stack.peek(), Some(&"c"));
    assert_eq!(stack.peek_at(0), Some(&"c"));
    assert_eq!(stack.peek_at(2), Some(&"a"));
    assert_eq!(stack.peek_at(3), None);
    assert_eq!(stack.peek_base(0), Some(&"a"));
    assert_eq!(stack.peek_base(2), Some(&"c"));
    assert_eq!(stack.peek_base(3), None);
}

#[test]
fn test_pop_n_preserves_push_order() {
    let mut stack: Stack<i32> = (1..=5).collect();

    assert_eq!(stack.pop_n(3), Some(vec![3, 4, 5]));
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.pop_n(3), None);
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.pop_n(0), Some(vec![]));
}

#[test]
fn test_peek_mut_and_push_ref() {
    let mut stack = Stack::new();
    *stack.push(10) += 1;
    if let Some(top) = stack.peek_at_mut(0) {
        *top *= 2;
    }
    assert_eq!(stack.peek(), Some(&22));
}

#[test]
fn test_iter_is_top_first() {
    let stack: Stack<i32> = (1..=3).collect();
    let items: Vec<_> = stack.iter().copied().collect();
    assert_eq!(items, vec![3, 2, 1]);
}

#[test]
fn test_iter_mut_finds_innermost() {
    let mut stack: Stack<(char, i32)> = [('a', 0), ('b', 0), ('a', 0)].into_iter().collect();
    if let Some(item) = stack.iter_mut().find(|(key, _)| *key == 'a') {
        item.1 = 7;
    }
    assert_eq!(stack.peek(), Some(&('a', 7)));
    assert_eq!(stack.peek_base(0), Some(&('a', 0)));
}

#[test]
fn test_truncate() {
    let mut stack: Stack<i32> = (1..=4).collect();
    stack.truncate(1);
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.peek(), Some(&1));
    stack.clear();
    assert!(stack.is_empty());
}
