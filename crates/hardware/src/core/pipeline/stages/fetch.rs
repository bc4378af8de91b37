//! Instruction Fetch Stage.
//!
//! Pulls up to `fetch_width` records from the trace into the fetch queue. A
//! mispredicted branch stops fetch until the branch has executed; no wrong-path
//! instructions are modeled.

use std::sync::Arc;

use tracing::trace;

use crate::common::{Cycle, TraceError};
use crate::core::pipeline::inst::InflightInst;
use crate::core::{Budget, Core};
use crate::trace::TraceReader;

/// Executes the fetch stage.
pub fn fetch_stage(
    core: &mut Core,
    trace: &mut TraceReader,
    budget: &mut Budget,
    now: Cycle,
) -> Result<(), TraceError> {
    if let Some(branch) = core.fetch_blocked_on {
        if !core.scoreboard.is_done(branch, now) {
            core.stats.stalls.fetch_redirect += 1;
            return Ok(());
        }
        core.fetch_blocked_on = None;
        trace!(inst = %branch, now, "fetch redirect resolved");
    }

    for _ in 0..core.config.pipeline.fetch_width {
        if trace.peek()?.is_none() {
            break;
        }
        if budget.fetch_queue == 0 {
            core.stats.stalls.fetch_queue_full += 1;
            break;
        }
        let Some(record) = trace.next_instruction()? else {
            break;
        };
        let id = record.id;
        let mispredicted = record.is_mispredicted();
        core.scoreboard.dispatch(id);
        let queued = core
            .fetch_queue
            .try_enqueue(InflightInst::new(Arc::new(record), now), now)
            .is_ok();
        debug_assert!(queued, "fetch budget exceeded queue capacity");
        budget.fetch_queue -= 1;
        core.progress += 1;
        trace!(inst = %id, now, "fetch");

        if mispredicted {
            core.fetch_blocked_on = Some(id);
            break;
        }
    }
    Ok(())
}
