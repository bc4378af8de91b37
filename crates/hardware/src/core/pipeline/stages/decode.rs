//! Instruction Decode Stage.
//!
//! Trace records arrive already decoded into operation classes, so decode only
//! models the queueing: instructions move from the fetch queue to the decode
//! queue once the fetch-to-decode delay has elapsed.

use tracing::trace;

use crate::common::Cycle;
use crate::core::pipeline::inst::Stage;
use crate::core::{Budget, Core};

/// Executes the decode stage.
pub fn decode_stage(core: &mut Core, budget: &mut Budget, now: Cycle) {
    let delay = core.config.pipeline.fetch_to_decode_delay;
    for _ in 0..core.config.pipeline.decode_width {
        if core.fetch_queue.peek_ready(now, delay).is_none() {
            break;
        }
        if budget.decode_queue == 0 {
            core.stats.stalls.decode_queue_full += 1;
            break;
        }
        let Some(mut inst) = core.fetch_queue.pop_front() else {
            break;
        };
        inst.advance(Stage::Decode, now);
        let id = inst.id();
        let queued = core.decode_queue.try_enqueue(inst, now).is_ok();
        debug_assert!(queued, "decode budget exceeded queue capacity");
        budget.decode_queue -= 1;
        core.progress += 1;
        trace!(inst = %id, now, "decode");
    }
}
