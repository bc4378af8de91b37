//! Issue / Execute / Writeback Stage.
//!
//! Runs in two phases each cycle:
//! 1. **Writeback:** Operations whose functional unit latency has elapsed release
//!    their unit. Non-memory instructions complete. Stores resolve their store
//!    queue entry and complete. Loads check the store queue, then their stream
//!    element, and only then go to memory. Loads held back by store ordering are
//!    retried here every cycle.
//! 2. **Issue:** Ready instructions are selected oldest first and claim a unit of
//!    their class, up to `issue_width` per cycle.

use std::cmp::Reverse;

use tracing::trace;

use crate::common::{Cycle, InstId, MemKind, TraceError};
use crate::core::pipeline::inst::Stage;
use crate::core::pipeline::store_queue::ForwardResult;
use crate::core::units::stream::StreamOutcome;
use crate::core::{Core, Owner};
use crate::memory::{MemRequest, MemoryInterface};

/// Executes writeback then issue.
///
/// Fails if a ready instruction has no functional unit of its class; rename
/// rejects such instructions, so this only trips on a core filled by hand.
pub fn iew_stage(
    core: &mut Core,
    memory: &mut dyn MemoryInterface,
    now: Cycle,
) -> Result<(), TraceError> {
    writeback(core, memory, now);
    issue(core, now)
}

fn writeback(core: &mut Core, memory: &mut dyn MemoryInterface, now: Cycle) {
    let mut finished = Vec::new();
    while let Some(&Reverse((ready_at, id))) = core.executing.peek() {
        if ready_at > now {
            break;
        }
        let _ = core.executing.pop();
        finished.push(id);
    }
    let retries = std::mem::take(&mut core.lsu_retry);

    let mut work: Vec<(InstId, bool)> = finished
        .into_iter()
        .map(|id| (id, true))
        .chain(retries.into_iter().map(|id| (id, false)))
        .collect();
    work.sort_unstable();

    let mut ordering_stall = false;
    for (id, from_unit) in work {
        let Some(inst) = core.rob.get_mut(id) else {
            continue;
        };
        let fu = if from_unit { inst.fu.take() } else { None };
        let class = inst.class();
        if let Some(handle) = fu {
            core.fu_pool.release(handle);
        }
        if class.is_load() {
            ordering_stall |= !access_memory(core, memory, id, now);
        } else if class.is_store() {
            resolve_store(core, id, now);
        } else {
            core.complete(id, now);
        }
    }
    if ordering_stall {
        core.stats.stalls.memory_order += 1;
    }
}

/// Stores finish at address generation; the write itself drains at commit.
fn resolve_store(core: &mut Core, id: InstId, now: Cycle) {
    let _ = core.sq.resolve(id);
    let ticket = core.rob.get(id).and_then(|inst| inst.stream.zip(inst.mem().map(|m| m.addr)));
    if let Some((ticket, addr)) = ticket {
        let _ = core.streams.consume(ticket, addr);
    }
    core.complete(id, now);
}

/// Resolves a load after address generation.
///
/// Returns false if the load is held back by an older store and must retry.
fn access_memory(
    core: &mut Core,
    memory: &mut dyn MemoryInterface,
    id: InstId,
    now: Cycle,
) -> bool {
    let Some((access, ticket)) = core
        .rob
        .get(id)
        .map(|inst| (inst.mem().cloned(), inst.stream))
    else {
        return true;
    };
    let Some(access) = access else {
        core.complete(id, now);
        return true;
    };

    match core.sq.forward_load(id, access.addr, access.size) {
        ForwardResult::Forward(store) => {
            if let Some(ticket) = ticket {
                core.streams.discard(ticket);
            }
            core.stats.loads_forwarded += 1;
            trace!(inst = %id, store = %store, now, "load forwarded");
            core.complete(id, now);
        }
        ForwardResult::Stall(store) => {
            if core.rob.get(id).is_some_and(|i| i.stage() != Stage::Memory) {
                core.set_stage(id, Stage::Memory, now);
                core.progress += 1;
            }
            core.lsu_retry.push(id);
            trace!(inst = %id, store = %store, now, "load ordered behind store");
            return false;
        }
        ForwardResult::Miss => {
            let outcome = ticket.map(|t| core.streams.consume(t, access.addr));
            match outcome {
                Some(StreamOutcome::Hit) => {
                    core.stats.loads_from_stream += 1;
                    core.complete(id, now);
                }
                Some(StreamOutcome::Late(request)) => {
                    core.stats.loads_from_stream += 1;
                    core.prefetch_waiters.entry(request).or_default().push(id);
                    core.set_stage(id, Stage::Memory, now);
                    core.progress += 1;
                }
                Some(StreamOutcome::Miss) | None => {
                    let request = MemRequest {
                        addr: access.addr,
                        size: access.size,
                        kind: MemKind::Read,
                    };
                    let _ = core.issue_memory(memory, request, Owner::Load(id), now);
                    core.stats.loads_to_memory += 1;
                    core.set_stage(id, Stage::Memory, now);
                    core.progress += 1;
                }
            }
        }
    }
    true
}

fn issue(core: &mut Core, now: Cycle) -> Result<(), TraceError> {
    let width = core.config.pipeline.issue_width;
    let scoreboard = &core.scoreboard;
    let ready = core.iq.peek_ready(now, |dep| scoreboard.is_ready(dep, now));

    let mut issued = 0;
    let mut unit_stall = false;
    for id in ready {
        if issued == width {
            break;
        }
        let Some(class) = core.iq.get(id).map(|e| e.class) else {
            continue;
        };
        if !class.needs_unit() {
            let _ = core.iq.remove(id);
            core.set_stage(id, Stage::Execute, now);
            core.complete(id, now);
            issued += 1;
            continue;
        }
        if !core.fu_pool.has_class(class) {
            return Err(TraceError::NoFunctionalUnit { id, class });
        }
        match core.fu_pool.allocate(class, now) {
            Ok(handle) => {
                let _ = core.iq.remove(id);
                core.executing.push(Reverse((handle.ready_at, id)));
                if let Some(inst) = core.rob.get_mut(id) {
                    inst.fu = Some(handle);
                    inst.advance(Stage::Execute, now);
                }
                if class.is_load() {
                    core.stats.loads_issued += 1;
                }
                core.progress += 1;
                issued += 1;
                trace!(inst = %id, ?class, ready_at = handle.ready_at, now, "issue");
            }
            Err(busy) => {
                unit_stall = true;
                trace!(inst = %id, %busy, now, "issue blocked");
            }
        }
    }
    if unit_stall {
        core.stats.stalls.fu_busy += 1;
    }
    Ok(())
}
