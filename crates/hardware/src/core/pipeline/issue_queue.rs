//! Instruction queue: renamed instructions waiting for operands and a unit.

use crate::common::{Cycle, InstId, OpClass};

/// Scheduling view of a renamed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IqEntry {
    /// Trace id.
    pub id: InstId,
    /// Unit class needed at issue.
    pub class: OpClass,
    /// Producers this entry still waits on.
    pub deps: Vec<InstId>,
    /// First cycle the entry may issue (rename-to-issue delay).
    pub eligible_at: Cycle,
}

/// Age-ordered instruction queue with oldest-ready-first selection.
#[derive(Clone, Debug)]
pub struct IssueQueue {
    entries: Vec<IqEntry>,
    capacity: usize,
}

impl IssueQueue {
    /// Creates an empty queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts an entry at the young end, or hands it back if full.
    pub fn try_enqueue(&mut self, entry: IqEntry) -> Result<(), IqEntry> {
        if self.is_full() {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Ids of entries that may issue at `now`, oldest first.
    ///
    /// An entry is ready once its eligibility cycle has been reached and
    /// `is_ready` holds for every producer. Producers found ready are dropped
    /// from the entry so later scans skip them.
    pub fn peek_ready(&mut self, now: Cycle, mut is_ready: impl FnMut(InstId) -> bool) -> Vec<InstId> {
        let mut ready = Vec::new();
        for entry in &mut self.entries {
            if entry.eligible_at > now {
                continue;
            }
            entry.deps.retain(|&dep| !is_ready(dep));
            if entry.deps.is_empty() {
                ready.push(entry.id);
            }
        }
        ready
    }

    /// Removes an entry by id.
    pub fn remove(&mut self, id: InstId) -> Option<IqEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: InstId) -> Option<&IqEntry> {
        self.entries.iter().find(|e| e.id == id)
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
