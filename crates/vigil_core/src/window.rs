//! # Rolling Windows
//!
//! Bounded sample buffers used by detectors. Capacity is fixed at
//! construction and enforced on every insert by evicting from the front, so
//! no window ever grows past its bound regardless of event rate.

use std::collections::VecDeque;

use vigil_shared::Timestamp;

/// One timestamped observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample<T> {
    /// When it was observed.
    pub at: Timestamp,
    /// What was observed.
    pub value: T,
}

impl<T> Sample<T> {
    /// Creates a sample.
    #[must_use]
    pub const fn new(at: Timestamp, value: T) -> Self {
        Self { at, value }
    }
}

/// Fixed-capacity FIFO.
#[derive(Clone, Debug)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Creates an empty window holding at most `capacity` items.
    ///
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, returning the evicted front item if the window was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the window holds `capacity` items.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Maximum number of items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest item.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Newest item.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Drops every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> RollingWindow<Sample<T>> {
    /// Drops samples observed before `cutoff`.
    pub fn evict_before(&mut self, cutoff: Timestamp) {
        while self.items.front().is_some_and(|s| s.at < cutoff) {
            self.items.pop_front();
        }
    }

    /// Gaps in milliseconds between consecutive samples.
    pub fn intervals(&self) -> impl Iterator<Item = u64> + '_ {
        self.items
            .iter()
            .zip(self.items.iter().skip(1))
            .map(|(a, b)| b.at.millis_since(a.at))
    }
}
