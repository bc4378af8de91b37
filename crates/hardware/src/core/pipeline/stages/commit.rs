//! Commit Stage: retire instructions from ROB head.
//!
//! This stage retires the oldest instruction(s) from the ROB in program order:
//! 1. Only completed entries whose writeback-to-commit delay elapsed may retire.
//! 2. A retiring store frees its store queue entry and drains its write to memory.
//! 3. Committed instructions update the instruction mix and branch counters.

use tracing::trace;

use crate::common::{Cycle, InstId, MemKind};
use crate::core::{Core, Owner};
use crate::memory::{MemRequest, MemoryInterface};

/// Executes the commit stage and returns the ids retired this cycle, oldest first.
pub fn commit_stage(core: &mut Core, memory: &mut dyn MemoryInterface, now: Cycle) -> Vec<InstId> {
    let delay = core.config.pipeline.iew_to_commit_delay;
    let mut committed = Vec::new();

    for _ in 0..core.config.pipeline.commit_width {
        let Some(inst) = core.rob.retire_oldest(now, delay) else {
            break;
        };
        let id = inst.id();
        let class = inst.class();
        core.scoreboard.retire(id);

        if class.is_store() {
            if let Some(entry) = core.sq.retire(id) {
                let request = MemRequest {
                    addr: entry.addr,
                    size: entry.size,
                    kind: MemKind::Write,
                };
                let _ = core.issue_memory(memory, request, Owner::Store(id), now);
            }
            core.stats.stores_committed += 1;
        }
        if let Some(outcome) = inst.record().outcome {
            core.stats.branches += 1;
            if outcome.mispredicted() {
                core.stats.branch_mispredictions += 1;
            }
        }
        *core.stats.inst_mix.entry(class).or_insert(0) += 1;
        core.stats.committed += 1;
        core.progress += 1;
        committed.push(id);
        trace!(inst = %id, ?class, now, "commit");
    }
    committed
}
