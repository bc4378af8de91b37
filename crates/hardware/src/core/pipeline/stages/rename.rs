//! Rename (dispatch) Stage.
//!
//! Moves decoded instructions, in order, into the back end:
//! 1. Allocates an ROB entry, an instruction queue entry, and for stores a
//!    store queue entry. A missing slot in any of them stalls rename.
//! 2. Applies stream configure/end events and assigns stream elements to
//!    stream-tagged accesses, in program order.
//! 3. Ends all remaining streams once the trace is exhausted and nothing is
//!    left to rename.

use tracing::{debug, trace, warn};

use crate::common::{Cycle, TraceError};
use crate::core::pipeline::inst::Stage;
use crate::core::pipeline::issue_queue::IqEntry;
use crate::core::pipeline::store_queue::StoreEntry;
use crate::core::{Budget, Core};
use crate::trace::StreamEvent;

/// Executes the rename stage.
///
/// `trace_exhausted` is true once the trace has reported its end.
pub fn rename_stage(
    core: &mut Core,
    budget: &mut Budget,
    trace_exhausted: bool,
    now: Cycle,
) -> Result<(), TraceError> {
    let delay = core.config.pipeline.decode_to_rename_delay;
    let issue_at = now + core.config.pipeline.rename_to_iew_delay;

    for _ in 0..core.config.pipeline.rename_width {
        let Some(head) = core.decode_queue.peek_ready(now, delay) else {
            break;
        };
        let class = head.class();
        let id = head.id();
        if budget.rob == 0 {
            core.stats.stalls.rob_full += 1;
            break;
        }
        if budget.iq == 0 {
            core.stats.stalls.iq_full += 1;
            break;
        }
        if class.is_store() && budget.sq == 0 {
            core.stats.stalls.sq_full += 1;
            break;
        }
        if class.needs_unit() && !core.fu_pool.has_class(class) {
            return Err(TraceError::NoFunctionalUnit { id, class });
        }
        let Some(mut inst) = core.decode_queue.pop_front() else {
            break;
        };

        let record = inst.record().clone();
        if let Some(StreamEvent::Configure(decl)) = &record.stream_event {
            core.streams.configure(decl, id)?;
        }
        if let Some(stream) = record.mem.as_ref().and_then(|m| m.stream) {
            inst.stream = Some(core.streams.assign(stream, id)?);
        }
        if let Some(StreamEvent::End(stream)) = &record.stream_event {
            core.streams.end(*stream, id)?;
        }

        for &dep in &record.deps {
            if !core.scoreboard.was_emitted(dep) {
                warn!(inst = %id, dep = %dep, "dependency on an instruction the trace never emitted");
            }
        }

        let mut queued = core
            .iq
            .try_enqueue(IqEntry {
                id,
                class,
                deps: record.deps.clone(),
                eligible_at: issue_at,
            })
            .is_ok();
        if let Some(access) = record.mem.as_ref().filter(|_| class.is_store()) {
            queued &= core
                .sq
                .try_enqueue(StoreEntry {
                    id,
                    addr: access.addr,
                    size: access.size,
                    resolved: false,
                })
                .is_ok();
            budget.sq -= 1;
        }
        inst.advance(Stage::Issue, now);
        queued &= core.rob.try_enqueue(inst).is_ok();
        debug_assert!(queued, "rename budget exceeded window capacity");
        budget.rob -= 1;
        budget.iq -= 1;
        core.progress += 1;
        trace!(inst = %id, ?class, now, "rename");
    }

    if trace_exhausted && core.decode_queue.is_empty() && !core.streams_ended {
        core.streams.end_all();
        core.streams_ended = true;
        debug!(now, "trace exhausted, ending remaining streams");
    }
    Ok(())
}
