//! Bounded in-order queue between two front-end stages.

use std::collections::VecDeque;

use crate::common::Cycle;

/// Bounded FIFO whose entries become visible to the next stage after a delay.
///
/// Each entry remembers the cycle it was enqueued in; `peek_ready` only
/// exposes the head once `delay` cycles have passed since then.
#[derive(Clone, Debug)]
pub struct StageQueue<T> {
    entries: VecDeque<(Cycle, T)>,
    capacity: usize,
}

impl<T> StageQueue<T> {
    /// Creates an empty queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, or hands it back if the queue is full.
    pub fn try_enqueue(&mut self, item: T, now: Cycle) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.entries.push_back((now, item));
        Ok(())
    }

    /// Returns the head if it has waited at least `delay` cycles.
    pub fn peek_ready(&self, now: Cycle, delay: Cycle) -> Option<&T> {
        self.entries
            .front()
            .filter(|(entered, _)| entered + delay <= now)
            .map(|(_, item)| item)
    }

    /// Removes and returns the head regardless of readiness.
    pub fn pop_front(&mut self) -> Option<T> {
        self.entries.pop_front().map(|(_, item)| item)
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&T> {
        self.entries.front().map(|(_, item)| item)
    }

    /// Iterates from oldest to youngest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the queue holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if no slot is free.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Configured capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots.
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }
}
