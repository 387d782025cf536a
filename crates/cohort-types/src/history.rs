//! Fixed-capacity history buffer.
//!
//! Agents keep several rolling logs (sentiment, stance, memory). Each one
//! is a [`BoundedHistory`]: pushing past the capacity evicts the oldest
//! entry, so the buffer never grows beyond its cap.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An append-only log that keeps at most `capacity` of the newest items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoundedHistory<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` items.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    /// Append an item, evicting the oldest entries if over capacity.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
        if self.items.len() > self.capacity {
            let excess = self.items.len().saturating_sub(self.capacity);
            self.items.drain(..excess);
        }
    }

    /// The configured capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the history holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The newest item, if any.
    pub fn latest(&self) -> Option<&T> {
        self.items.last()
    }

    /// The newest `n` items, oldest first.
    pub fn recent(&self, n: usize) -> &[T] {
        let start = self.items.len().saturating_sub(n);
        self.items.get(start..).unwrap_or_default()
    }

    /// View all held items, oldest first.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a BoundedHistory<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
