//! Id-based scoreboard for producer/consumer dependency tracking.
//!
//! Trace records name their producers by instruction id. The scoreboard maps
//! every fetched, not-yet-committed id to its completion state and remembers
//! which ids the trace has emitted, so the issue stage can answer "is this
//! producer's result available?" with one lookup per dependency.
//!
//! Emitted ids are kept as a high-water mark plus the gaps below it. A dense
//! trace never records a gap.

use std::collections::{BTreeMap, HashMap};

use crate::common::{Cycle, InstId};

/// Completion state of an in-flight producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Producer {
    Pending,
    Completed(Cycle),
}

/// Id-based scoreboard.
#[derive(Clone, Debug, Default)]
pub struct Scoreboard {
    in_flight: HashMap<InstId, Producer>,
    /// Highest id dispatched so far.
    high_water: Option<u64>,
    /// Ids skipped by the trace below `high_water`, as `start -> end` (exclusive).
    holes: BTreeMap<u64, u64>,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly fetched instruction. Ids must arrive in increasing order.
    pub fn dispatch(&mut self, id: InstId) {
        let _ = self.in_flight.insert(id, Producer::Pending);
        let next = self.high_water.map_or(0, |last| last + 1);
        if id.0 > next {
            let _ = self.holes.insert(next, id.0);
        }
        self.high_water = Some(self.high_water.map_or(id.0, |last| last.max(id.0)));
    }

    /// Records that `id` produced its result at `now`.
    pub fn complete(&mut self, id: InstId, now: Cycle) {
        if let Some(state) = self.in_flight.get_mut(&id) {
            *state = Producer::Completed(now);
        }
    }

    /// Forgets a committed instruction.
    pub fn retire(&mut self, id: InstId) {
        let _ = self.in_flight.remove(&id);
    }

    /// Returns true if the trace has emitted `id`.
    pub fn was_emitted(&self, id: InstId) -> bool {
        if self.high_water.is_none_or(|last| id.0 > last) {
            return false;
        }
        self.holes
            .range(..=id.0)
            .next_back()
            .is_none_or(|(_, &end)| id.0 >= end)
    }

    /// Number of id gaps recorded.
    pub fn holes(&self) -> usize {
        self.holes.len()
    }

    /// Returns true if the result of `dep` is available at `now`.
    ///
    /// Completed producers are ready from their completion cycle on; producers
    /// that were emitted but are no longer tracked have committed. A producer
    /// the trace never emitted never becomes ready.
    pub fn is_ready(&self, dep: InstId, now: Cycle) -> bool {
        match self.in_flight.get(&dep) {
            Some(Producer::Completed(at)) => *at <= now,
            Some(Producer::Pending) => false,
            None => self.was_emitted(dep),
        }
    }

    /// Same as [`Self::is_ready`]; used for fetch redirect on mispredicted branches.
    pub fn is_done(&self, id: InstId, now: Cycle) -> bool {
        self.is_ready(id, now)
    }

    /// Number of tracked in-flight instructions.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
