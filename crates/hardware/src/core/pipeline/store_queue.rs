//! Store queue with store-to-load forwarding.
//!
//! Stores hold an entry from rename until they commit. A store's address is
//! considered resolved once its address generation finished; before that, any
//! younger load is conservatively ordered behind it.

use std::collections::VecDeque;

use crate::common::InstId;

/// A store waiting to commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreEntry {
    /// Trace id of the store.
    pub id: InstId,
    /// Byte address.
    pub addr: u64,
    /// Access size in bytes.
    pub size: u32,
    /// Address generation finished.
    pub resolved: bool,
}

impl StoreEntry {
    fn end(&self) -> u64 {
        self.addr.saturating_add(u64::from(self.size))
    }

    fn overlaps(&self, addr: u64, size: u32) -> bool {
        let end = addr.saturating_add(u64::from(size));
        self.addr < end && addr < self.end()
    }

    fn covers(&self, addr: u64, size: u32) -> bool {
        self.addr <= addr && addr.saturating_add(u64::from(size)) <= self.end()
    }
}

/// Outcome of checking a load against older in-flight stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardResult {
    /// The youngest older overlapping store fully covers the load.
    Forward(InstId),
    /// The load must wait: an older store is unresolved or only partially overlaps.
    Stall(InstId),
    /// No older store overlaps; the load goes to memory.
    Miss,
}

/// Program-ordered store queue.
#[derive(Clone, Debug)]
pub struct StoreQueue {
    entries: VecDeque<StoreEntry>,
    capacity: usize,
}

impl StoreQueue {
    /// Creates an empty store queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a store at rename, or hands it back if full.
    pub fn try_enqueue(&mut self, entry: StoreEntry) -> Result<(), StoreEntry> {
        if self.is_full() {
            return Err(entry);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Marks a store's address as known.
    pub fn resolve(&mut self, id: InstId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Checks a load against every store older than it, youngest first.
    pub fn forward_load(&self, load: InstId, addr: u64, size: u32) -> ForwardResult {
        for store in self.entries.iter().rev().filter(|s| s.id < load) {
            if !store.resolved {
                return ForwardResult::Stall(store.id);
            }
            if store.overlaps(addr, size) {
                return if store.covers(addr, size) {
                    ForwardResult::Forward(store.id)
                } else {
                    ForwardResult::Stall(store.id)
                };
            }
        }
        ForwardResult::Miss
    }

    /// Removes the oldest store at commit. Returns the entry if it matched `id`.
    pub fn retire(&mut self, id: InstId) -> Option<StoreEntry> {
        if self.entries.front().is_some_and(|e| e.id == id) {
            self.entries.pop_front()
        } else {
            None
        }
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
