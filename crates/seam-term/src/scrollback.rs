//! Scrollback buffer: rows retired from the visible viewport.
//!
//! Stores full [`Row`]s so that SGR attributes, wide-char flags, and the
//! soft-wrap bit survive through history. Uses a `VecDeque` ring for O(1)
//! push/pop at both ends; the newest content is at the back.

use std::collections::VecDeque;

use crate::grid::Row;

/// Scrollback buffer with a configurable line capacity.
///
/// When over capacity, the oldest row (front of the deque) is evicted.
#[derive(Debug, Clone)]
pub struct Scrollback {
    rows: VecDeque<Row>,
    capacity: usize,
}

impl Scrollback {
    /// Create a new scrollback with the given line capacity.
    ///
    /// A capacity of `0` disables scrollback (all pushes are dropped).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Maximum number of rows this scrollback can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest rows if shrinking.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.rows.len() > capacity {
            self.rows.pop_front();
        }
    }

    /// Current number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the scrollback is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Push a retired row into scrollback, evicting the oldest if full.
    pub fn push_row(&mut self, row: Row) -> Option<Row> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.rows.len() == self.capacity {
            self.rows.pop_front()
        } else {
            None
        };
        self.rows.push_back(row);
        evicted
    }

    /// Pop the most recent (newest) row from scrollback.
    ///
    /// Used when the viewport grows taller and rows are reclaimed, or when
    /// a full-screen scroll-down pulls history back in.
    pub fn pop_newest(&mut self) -> Option<Row> {
        self.rows.pop_back()
    }

    /// Get a row by index (0 = oldest).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Iterate over stored rows from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Drain all rows, oldest first, leaving the buffer empty.
    pub fn drain_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Clear all stored rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(0)
    }
}
