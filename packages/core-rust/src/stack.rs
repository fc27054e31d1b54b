//! LIFO operand stack.
//!
//! `OperandStack` is a plain single-owner structure; the [`Calculator`]
//! wraps it in a lock to make it shareable.
//!
//! [`Calculator`]: crate::calculator::Calculator

use crate::error::{CalcError, CalcResult};

/// Ordered sequence of integers, last pushed is top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandStack {
    values: Vec<i64>,
}

impl OperandStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `values` in the given order; the last element becomes the top.
    pub fn push(&mut self, values: &[i64]) {
        self.values.extend_from_slice(values);
    }

    /// Removes the top `count` elements and returns them top-first.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::Underflow`] if `count` exceeds the current size.
    /// The stack is left unchanged in that case.
    pub fn pop(&mut self, count: usize) -> CalcResult<Vec<i64>> {
        let available = self.values.len();
        if count > available {
            return Err(CalcError::Underflow {
                requested: count.to_string(),
                available,
            });
        }
        let mut popped = self.values.split_off(available - count);
        popped.reverse();
        Ok(popped)
    }

    /// Current number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the contents ordered top-first.
    #[must_use]
    pub fn top_first(&self) -> Vec<i64> {
        self.values.iter().rev().copied().collect()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
