//! Out-of-order core timing model.
//!
//! This module contains every piece of per-run mutable state of the modeled core.
//! It includes:
//! 1. **Pipeline:** Instruction window structures and the five stage functions.
//! 2. **Units:** The functional unit pool and the stream engine.
//! 3. **Core:** The simulation context the stages operate on, passed explicitly
//!    to each stage call.

/// Pipeline structures (queues, ROB, IQ, store queue, scoreboard) and stage logic.
pub mod pipeline;

/// Execution resources: functional units and the stream prefetch engine.
pub mod units;

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use tracing::trace;

use self::pipeline::inst::{InflightInst, Stage};
use self::pipeline::issue_queue::IssueQueue;
use self::pipeline::queue::StageQueue;
use self::pipeline::rob::Rob;
use self::pipeline::scoreboard::Scoreboard;
use self::pipeline::store_queue::StoreQueue;
use self::units::fu_pool::FuPool;
use self::units::stream::StreamEngine;
use crate::common::{Cycle, InstId};
use crate::config::Config;
use crate::memory::{MemRequest, MemoryInterface, RequestId};
use crate::stats::{OccupancyStats, SimStats, WindowOccupancy};

/// Who is waiting for a memory request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    /// A demand load in the ROB.
    Load(InstId),
    /// A committed store draining to memory.
    Store(InstId),
    /// A stream engine prefetch.
    Prefetch,
}

/// An issued, not yet completed memory request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outstanding {
    /// Requester.
    pub owner: Owner,
    /// Cycle the request was issued in.
    pub issued: Cycle,
}

/// Free slots of every bounded structure, snapshotted at the start of a cycle.
///
/// Stages spend from this budget instead of reading live occupancy, so space
/// freed by a later stage in the same cycle is not reused until the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Budget {
    /// Fetch queue slots.
    pub fetch_queue: usize,
    /// Decode queue slots.
    pub decode_queue: usize,
    /// ROB slots.
    pub rob: usize,
    /// Instruction queue slots.
    pub iq: usize,
    /// Store queue slots.
    pub sq: usize,
}

/// Per-structure occupancy at the end of a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    /// Fetch queue entries.
    pub fetch_queue: usize,
    /// Decode queue entries.
    pub decode_queue: usize,
    /// ROB entries.
    pub rob: usize,
    /// Instruction queue entries.
    pub iq: usize,
    /// Store queue entries.
    pub sq: usize,
    /// Prefetched elements issued but not yet consumed.
    pub prefetches: usize,
}

/// Simulation context: all mutable state of the modeled core.
#[derive(Debug)]
pub struct Core {
    /// Validated configuration.
    pub config: Config,
    /// Fetched instructions awaiting decode.
    pub fetch_queue: StageQueue<InflightInst>,
    /// Decoded instructions awaiting rename.
    pub decode_queue: StageQueue<InflightInst>,
    /// Reorder buffer; owns renamed instructions until commit.
    pub rob: Rob,
    /// Instruction queue.
    pub iq: IssueQueue,
    /// Store queue.
    pub sq: StoreQueue,
    /// Producer completion tracking.
    pub scoreboard: Scoreboard,
    /// Functional units.
    pub fu_pool: FuPool,
    /// Stream prefetch engine.
    pub streams: StreamEngine,
    /// Operations on functional units, keyed by finish cycle.
    pub executing: BinaryHeap<Reverse<(Cycle, InstId)>>,
    /// Loads held back by store ordering, retried every cycle.
    pub lsu_retry: Vec<InstId>,
    /// Loads waiting on an in-flight prefetch.
    pub prefetch_waiters: HashMap<RequestId, Vec<InstId>>,
    /// Memory requests not yet completed.
    pub outstanding: BTreeMap<RequestId, Outstanding>,
    /// Mispredicted branch fetch is waiting on.
    pub fetch_blocked_on: Option<InstId>,
    /// Streams were ended because the trace ran out.
    pub streams_ended: bool,
    /// Statistics collected so far (stream counters live in the engine).
    pub stats: SimStats,
    /// Count of instruction-level events; unchanged across a cycle means no progress.
    pub progress: u64,
}

impl Core {
    /// Builds an empty core. `config` must already be validated.
    pub fn new(config: Config) -> Self {
        let w = &config.window;
        let stats = SimStats {
            occupancy: WindowOccupancy {
                fetch_queue: OccupancyStats::new(w.fetch_queue_size),
                decode_queue: OccupancyStats::new(w.decode_queue_size),
                rob: OccupancyStats::new(w.rob_size),
                iq: OccupancyStats::new(w.iq_size),
                sq: OccupancyStats::new(w.sq_size),
            },
            ..SimStats::default()
        };
        Self {
            fetch_queue: StageQueue::new(w.fetch_queue_size),
            decode_queue: StageQueue::new(w.decode_queue_size),
            rob: Rob::new(w.rob_size),
            iq: IssueQueue::new(w.iq_size),
            sq: StoreQueue::new(w.sq_size),
            scoreboard: Scoreboard::new(),
            fu_pool: FuPool::new(&config.fu_pool),
            streams: StreamEngine::new(&config.stream),
            executing: BinaryHeap::new(),
            lsu_retry: Vec::new(),
            prefetch_waiters: HashMap::new(),
            outstanding: BTreeMap::new(),
            fetch_blocked_on: None,
            streams_ended: false,
            stats,
            progress: 0,
            config,
        }
    }

    /// Free slots of every structure right now.
    pub fn budget(&self) -> Budget {
        Budget {
            fetch_queue: self.fetch_queue.free_slots(),
            decode_queue: self.decode_queue.free_slots(),
            rob: self.rob.free_slots(),
            iq: self.iq.free_slots(),
            sq: self.sq.free_slots(),
        }
    }

    /// Current occupancy of every structure.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            fetch_queue: self.fetch_queue.len(),
            decode_queue: self.decode_queue.len(),
            rob: self.rob.len(),
            iq: self.iq.len(),
            sq: self.sq.len(),
            prefetches: self.streams.outstanding(),
        }
    }

    /// Adds one occupancy sample per structure.
    pub fn sample_occupancy(&mut self) {
        let occ = self.occupancy();
        let stats = &mut self.stats.occupancy;
        stats.fetch_queue.sample(occ.fetch_queue);
        stats.decode_queue.sample(occ.decode_queue);
        stats.rob.sample(occ.rob);
        stats.iq.sample(occ.iq);
        stats.sq.sample(occ.sq);
    }

    /// Returns true if no instruction is anywhere in the pipeline.
    pub fn is_drained(&self) -> bool {
        self.fetch_queue.is_empty() && self.decode_queue.is_empty() && self.rob.is_empty()
    }

    /// Oldest in-flight instruction and where it sits.
    pub fn oldest(&self) -> Option<(InstId, Stage)> {
        self.rob
            .head()
            .map(|e| &e.inst)
            .or_else(|| self.decode_queue.front())
            .or_else(|| self.fetch_queue.front())
            .map(|inst| (inst.id(), inst.stage()))
    }

    /// Marks an instruction complete: its result is visible to consumers from `now`.
    ///
    /// A completed stream access also marks its element as arrived, which
    /// unblocks prefetches of streams that depend on it.
    pub fn complete(&mut self, id: InstId, now: Cycle) {
        self.scoreboard.complete(id, now);
        let ticket = self.rob.get(id).and_then(|inst| inst.stream);
        if self.rob.complete(id, now) {
            self.progress += 1;
            if let Some(ticket) = ticket {
                self.streams.mark_arrived(ticket);
            }
            trace!(inst = %id, now, "complete");
        }
    }

    /// Moves an instruction in the ROB to `stage`.
    pub fn set_stage(&mut self, id: InstId, stage: Stage, now: Cycle) {
        if let Some(inst) = self.rob.get_mut(id) {
            inst.advance(stage, now);
        }
    }

    /// Sends a request to memory and remembers its owner.
    ///
    /// # Arguments
    ///
    /// * `memory` - Memory system that accepts the request.
    /// * `request` - Address, size and kind of the access.
    /// * `owner` - Who consumes the completion: a load, a store or the stream engine.
    /// * `now` - Current cycle, recorded as the issue time.
    ///
    /// # Returns
    ///
    /// The id the memory system assigned; its completion is routed back to `owner`.
    pub fn issue_memory(
        &mut self,
        memory: &mut dyn MemoryInterface,
        request: MemRequest,
        owner: Owner,
        now: Cycle,
    ) -> RequestId {
        let id = memory.issue_request(request, now);
        let _ = self.outstanding.insert(id, Outstanding { owner, issued: now });
        trace!(request = %id, addr = request.addr, kind = ?request.kind, ?owner, now, "memory request");
        id
    }

    /// Full statistics snapshot, including stream engine counters.
    pub fn snapshot_stats(&self) -> SimStats {
        let mut stats = self.stats.clone();
        stats.stream = self.streams.stats().clone();
        stats
    }
}
