//! Cross-frame vote stabilizers.
//!
//! Per-frame classifier output is noisy, especially at hand-shape transitions. These
//! stabilizers accept a classification only after it recurs enough times within a sliding
//! window, trading a few frames of latency for an output that doesn't flicker.

use itertools::Itertools;

use crate::window::SlidingWindow;

use super::Filter;

/// Majority vote over a sliding window of class indices.
///
/// A pushed index becomes the stabilized result once the window holds at least `min_entries`
/// votes and the most frequent index accounts for at least `min_count` of them.
#[derive(Debug, Clone)]
pub struct MajorityVote {
    window: SlidingWindow<usize>,
    min_entries: usize,
    min_count: usize,
}

impl MajorityVote {
    pub fn new(window_size: usize, min_entries: usize, min_count: usize) -> Self {
        Self {
            window: SlidingWindow::new(window_size),
            min_entries,
            min_count,
        }
    }

    /// Records a vote for `index` and returns the winning index, if any.
    pub fn push(&mut self, index: usize) -> Option<usize> {
        self.window.push(index);
        if self.window.len() < self.min_entries {
            return None;
        }

        // Ties resolve to the lowest index so replays stay deterministic.
        let (winner, count) = self
            .window
            .iter()
            .counts()
            .into_iter()
            .map(|(&index, count)| (index, count))
            .max_by_key(|&(index, count)| (count, std::cmp::Reverse(index)))?;
        (count >= self.min_count).then_some(winner)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Unanimity vote over a sliding window of class indices.
///
/// Stricter than [`MajorityVote`]: the window must be completely full and every entry must
/// equal the index just pushed. Used by the dynamic pipeline, where a single misread inside a
/// 30-frame gesture window would otherwise surface as a spurious word.
#[derive(Debug, Clone)]
pub struct UnanimousVote {
    window: SlidingWindow<usize>,
}

impl UnanimousVote {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: SlidingWindow::new(window_size),
        }
    }

    /// Records `index` and returns whether the whole window now unanimously agrees on it.
    pub fn push(&mut self, index: usize) -> bool {
        self.window.push(index);
        self.window.is_full() && self.window.iter().all(|&i| i == index)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Debounces a boolean signal by majority over a sliding window.
///
/// The output only flips when at least `min_count` of the last `window_size` samples are true,
/// so a single noisy frame cannot flip downstream arbitration.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: SlidingWindow<bool>,
    min_count: usize,
}

impl Debounce {
    pub fn new(window_size: usize, min_count: usize) -> Self {
        Self {
            window: SlidingWindow::new(window_size),
            min_count,
        }
    }
}

impl Filter<bool> for Debounce {
    fn push(&mut self, value: bool) -> bool {
        self.window.push(value);
        self.window.iter().filter(|&&v| v).count() >= self.min_count
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}
