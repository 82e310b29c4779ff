//! Growable LIFO stack with indexed access from both ends.

use std::fmt;

/// A growable LIFO stack.
///
/// Index `0` passed to [`peek_at`](Stack::peek_at) is the top of the stack;
/// index `0` passed to [`peek_base`](Stack::peek_base) is the bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    /// Create an empty stack.
    #[inline]
    pub const fn new() -> Self {
        Stack { items: Vec::new() }
    }

    /// Create an empty stack with room for `capacity` items.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Stack {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Push an item and return a mutable reference to it.
    #[inline]
    pub fn push(&mut self, item: T) -> &mut T {
        self.items.push(item);
        let top = self.items.len() - 1;
        &mut self.items[top]
    }

    /// Pop the top item.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Pop the top `count` items, returned in push order (bottom-most first).
    ///
    /// Returns `None` (and leaves the stack untouched) if fewer than `count`
    /// items are present.
    pub fn pop_n(&mut self, count: usize) -> Option<Vec<T>> {
        let start = self.items.len().checked_sub(count)?;
        Some(self.items.split_off(start))
    }

    /// The top item.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// The top item, mutably.
    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    /// The item `depth` levels below the top (`0` is the top).
    #[inline]
    pub fn peek_at(&self, depth: usize) -> Option<&T> {
        let index = self.items.len().checked_sub(depth + 1)?;
        self.items.get(index)
    }

    /// The item `depth` levels below the top, mutably.
    #[inline]
    pub fn peek_at_mut(&mut self, depth: usize) -> Option<&mut T> {
        let index = self.items.len().checked_sub(depth + 1)?;
        self.items.get_mut(index)
    }

    /// The item `height` levels above the bottom (`0` is the bottom).
    #[inline]
    pub fn peek_base(&self, height: usize) -> Option<&T> {
        self.items.get(height)
    }

    /// Number of items on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Shrink the stack to `len` items, dropping everything above.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Iterate from the top of the stack to the bottom.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter().rev()
    }

    /// Iterate mutably from the top of the stack to the bottom.
    #[inline]
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + ExactSizeIterator {
        self.items.iter_mut().rev()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter().rev()).finish()
    }
}

impl<T> FromIterator<T> for Stack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Stack {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests;
