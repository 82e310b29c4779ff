//! Stack utilities for the stirrup expression engine.
//!
//! Two unrelated kinds of "stack" live here:
//!
//! - [`Stack`]: a growable LIFO with indexed peeks from the top and from the
//!   bottom. The parser uses it for its operand and operator stacks, and the
//!   render context uses it for section frames, where backreach lookups need
//!   "N levels up" and root lookups need "the bottom frame".
//! - [`ensure_sufficient_stack`]: grows the native call stack on demand so
//!   that deeply nested expressions (parenthesized groups, interpolations
//!   inside interpolations, recursive named expressions) cannot overflow.
//!
//! # Configuration
//!
//! - **Red zone**: 100KB - If less than this remains, we grow the stack
//! - **Growth size**: 1MB - Each growth allocates this much additional space

mod stack;

pub use stack::Stack;

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// If the remaining stack is below the red zone threshold, this will
/// allocate additional stack space before calling `f`.
///
/// # Platform Behavior
///
/// - **Native**: Uses `stacker::maybe_grow` to dynamically grow the stack
/// - **WASM**: Simply calls `f()` directly (WASM manages its own stack)
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Depth of a string of nested parentheses, counted recursively.
    fn nesting(text: &[u8]) -> usize {
        ensure_sufficient_stack(|| match text {
            [b'(', inner @ .., b')'] => 1 + nesting(inner),
            _ => 0,
        })
    }

    #[test]
    fn test_nesting_far_beyond_the_native_stack() {
        let depth = 50_000;
        let text = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(nesting(text.as_bytes()), depth);
    }

    #[test]
    fn test_frames_survive_growth() {
        fn walk(frames: &mut Stack<u32>, left: u32) -> Option<u32> {
            ensure_sufficient_stack(|| {
                if left == 0 {
                    return frames.peek_base(0).copied();
                }
                frames.push(left);
                let root = walk(frames, left - 1);
                frames.pop();
                root
            })
        }

        let mut frames = Stack::new();
        frames.push(0);
        assert_eq!(walk(&mut frames, 20_000), Some(0));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_passes_results_through() {
        let parsed: Result<u8, String> = ensure_sufficient_stack(|| "7".parse().map_err(|_| "bad".to_string()));
        assert_eq!(parsed, Ok(7));
    }
}
