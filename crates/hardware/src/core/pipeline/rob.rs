//! Reorder Buffer (ROB) for in-order commit.
//!
//! The ROB owns every instruction from rename until it retires. It provides:
//! 1. **Allocation:** Appends renamed instructions in program order.
//! 2. **Completion:** Marks an instruction done once its result is available.
//! 3. **In-order Commit:** Retires only from the head, and only completed entries
//!    whose writeback-to-commit delay has elapsed.

use std::collections::VecDeque;

use super::inst::{InflightInst, Stage};
use crate::common::{Cycle, InstId};

/// Lifecycle state of an ROB entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RobState {
    /// Renamed but not finished.
    #[default]
    InFlight,
    /// Finished at the given cycle; waiting to commit.
    Completed(Cycle),
}

/// A single entry in the Reorder Buffer.
#[derive(Clone, Debug)]
pub struct RobEntry {
    /// The instruction occupying this slot.
    pub inst: InflightInst,
    /// Current lifecycle state.
    pub state: RobState,
}

/// Reorder Buffer, ordered oldest first.
#[derive(Clone, Debug)]
pub struct Rob {
    entries: VecDeque<RobEntry>,
    capacity: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    /// Appends an instruction at the tail, or hands it back if the ROB is full.
    ///
    /// Instructions must arrive in program order.
    pub fn try_enqueue(&mut self, inst: InflightInst) -> Result<(), InflightInst> {
        if self.is_full() {
            return Err(inst);
        }
        debug_assert!(self.entries.back().is_none_or(|e| e.inst.id() < inst.id()));
        self.entries.push_back(RobEntry {
            inst,
            state: RobState::InFlight,
        });
        Ok(())
    }

    fn position(&self, id: InstId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |e| e.inst.id()).ok()
    }

    /// Looks up an in-flight instruction.
    pub fn get(&self, id: InstId) -> Option<&InflightInst> {
        self.position(id).map(|i| &self.entries[i].inst)
    }

    /// Looks up an in-flight instruction for mutation.
    pub fn get_mut(&mut self, id: InstId) -> Option<&mut InflightInst> {
        let i = self.position(id)?;
        Some(&mut self.entries[i].inst)
    }

    /// Marks an instruction complete. Returns false if it is not in the ROB.
    pub fn complete(&mut self, id: InstId, now: Cycle) -> bool {
        let Some(i) = self.position(id) else {
            return false;
        };
        let entry = &mut self.entries[i];
        entry.state = RobState::Completed(now);
        entry.inst.advance(Stage::Complete, now);
        true
    }

    /// Oldest instruction.
    pub fn head(&self) -> Option<&RobEntry> {
        self.entries.front()
    }

    /// Removes the head if it completed at least `delay` cycles ago.
    pub fn retire_oldest(&mut self, now: Cycle, delay: Cycle) -> Option<InflightInst> {
        match self.entries.front()?.state {
            RobState::Completed(at) if at + delay <= now => {
                self.entries.pop_front().map(|e| e.inst)
            }
            _ => None,
        }
    }

    /// Iterates from oldest to youngest.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> {
        self.entries.iter()
    }
}
