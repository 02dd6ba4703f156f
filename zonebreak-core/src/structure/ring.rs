//! PivotRing: fixed-capacity arena of the most recent confirmed pivots.

use super::pivot::Pivot;

/// Bounded ring buffer: an arena of `capacity` slots plus a head index.
///
/// Pushing into a full ring overwrites the oldest pivot. Iteration yields
/// pivots oldest first.
#[derive(Debug, Clone)]
pub struct PivotRing {
    slots: Vec<Pivot>,
    capacity: usize,
    /// Slot the next push writes to.
    head: usize,
}

impl PivotRing {
    /// `capacity` is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn push(&mut self, pivot: Pivot) {
        if self.slots.len() < self.capacity {
            self.slots.push(pivot);
        } else {
            self.slots[self.head] = pivot;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pivots in chronological order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Pivot> {
        let split = if self.slots.len() < self.capacity {
            0
        } else {
            self.head
        };
        let (newer, older) = self.slots.split_at(split);
        older.iter().chain(newer.iter())
    }
}
