//! Capped FIFO sequences backing every temporal buffer in the crate.

use std::collections::VecDeque;

/// An ordered sequence with a fixed capacity and FIFO eviction.
///
/// Pushing beyond the capacity silently evicts the oldest entry. Every temporal buffer in the
/// recognition pipelines (landmark histories, sequence windows, vote windows, presence windows)
/// is one of these; the differences are only in capacity and element type.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Creates an empty window holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sliding window capacity must be non-zero");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, evicting the oldest entry if the window is full.
    pub fn push(&mut self, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns whether the window holds exactly `capacity` entries.
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Iterates from oldest to newest entry.
    pub fn iter(&self) -> impl Iterator<Item = &T> + Clone {
        self.entries.iter()
    }

    /// Iterates over at most the `n` newest entries, oldest of those first.
    ///
    /// Different consumers read the same window at different suffix lengths (e.g. the word
    /// pipeline's hand-presence gate only inspects the most recent slice).
    pub fn iter_last(&self, n: usize) -> impl Iterator<Item = &T> + Clone {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    /// Returns the newest entry, if any.
    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Removes all entries; capacity is unchanged.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
