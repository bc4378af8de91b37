//! Stream engine.
//!
//! Tracks the memory-access streams declared by the trace and runs ahead of
//! their demand accesses with prefetch requests. It provides:
//! 1. **Lifecycle:** `Idle -> Active -> Draining -> Closed` per stream, driven by
//!    trace configure/end events, pattern recognition, and end of trace.
//! 2. **Address generation:** exact addresses in oracle mode, learned strides in
//!    throttled mode.
//! 3. **Run-ahead control:** at most `run_ahead` issued-but-unconsumed elements per
//!    stream, with the distance adjusted by a [`Throttle`] policy.
//! 4. **Reconciliation:** every demand access is matched against its element and
//!    classified as a hit, a late fetch, or a miss; mispredicted elements are wasted.
//! 5. **Chaining:** a dependent stream names a base stream; its element `i` is
//!    prefetched only after element `i` of the base stream has arrived.

/// Per-stream state and stride training.
pub mod descriptor;

/// Run-ahead throttling policies.
pub mod throttle;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use self::descriptor::{Element, ElementState, Pattern, StreamDescriptor, StreamState};
pub use self::throttle::Throttle;
use crate::common::{Cycle, InstId, MemKind, StreamId, TraceError};
use crate::config::{StreamConfig, StreamMode};
use crate::memory::{MemRequest, RequestId};
use crate::stats::StreamStats;
use crate::trace::StreamDecl;

/// Stream element assigned to one demand access at rename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamTicket {
    /// Descriptor slot; stays valid after the stream id is reused.
    pub slot: usize,
    /// Element index within the stream.
    pub index: u64,
}

/// How a demand access was served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The prefetched element had already arrived.
    Hit,
    /// The prefetch is still in flight; wait for this request.
    Late(RequestId),
    /// No usable prefetch; the access must go to memory.
    Miss,
}

/// Stream engine.
#[derive(Debug)]
pub struct StreamEngine {
    mode: StreamMode,
    config: StreamConfig,
    streams: Vec<StreamDescriptor>,
    active: BTreeMap<StreamId, usize>,
    live: BTreeSet<usize>,
    requests: HashMap<RequestId, (usize, u64)>,
    stats: StreamStats,
}

impl StreamEngine {
    /// Creates an engine with no streams.
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            mode: config.mode,
            config: config.clone(),
            streams: Vec::new(),
            active: BTreeMap::new(),
            live: BTreeSet::new(),
            requests: HashMap::new(),
            stats: StreamStats::default(),
        }
    }

    /// Declares a stream.
    ///
    /// # Arguments
    ///
    /// * `decl` - Declaration carried by the configure event.
    /// * `by` - Instruction that carries the event.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the stream is active. Fails if the id is already active
    /// or if `decl.base_stream` names a stream that is not active.
    pub fn configure(&mut self, decl: &StreamDecl, by: InstId) -> Result<(), TraceError> {
        if self.active.contains_key(&decl.id) {
            return Err(TraceError::DuplicateStream {
                id: by,
                stream: decl.id,
            });
        }
        let base_slot = decl
            .base_stream
            .map(|base| {
                self.active.get(&base).copied().ok_or(TraceError::UnknownBaseStream {
                    id: by,
                    stream: decl.id,
                    base,
                })
            })
            .transpose()?;
        let slot = self.streams.len();
        let mut descriptor = StreamDescriptor::new(
            decl.clone(),
            by,
            self.mode == StreamMode::Oracle,
            Throttle::from_config(&self.config),
        );
        descriptor.base_slot = base_slot;
        debug!(
            stream = %decl.id,
            slot,
            ?base_slot,
            state = ?descriptor.state,
            run_ahead = descriptor.throttle.run_ahead(),
            "stream configured"
        );
        self.streams.push(descriptor);
        let _ = self.active.insert(decl.id, slot);
        let _ = self.live.insert(slot);
        self.stats.configured += 1;
        if base_slot.is_some() {
            self.stats.dependent_configured += 1;
        }
        Ok(())
    }

    /// Hands the next element of `stream` to a demand access.
    pub fn assign(&mut self, stream: StreamId, by: InstId) -> Result<StreamTicket, TraceError> {
        let slot = *self
            .active
            .get(&stream)
            .ok_or(TraceError::UnknownStream { id: by, stream })?;
        let d = &mut self.streams[slot];
        let index = d.assigned;
        d.assigned += 1;
        self.stats.elements_assigned += 1;
        Ok(StreamTicket { slot, index })
    }

    /// Ends a stream; elements already assigned are still served.
    pub fn end(&mut self, stream: StreamId, by: InstId) -> Result<(), TraceError> {
        let slot = self
            .active
            .remove(&stream)
            .ok_or(TraceError::UnknownStream { id: by, stream })?;
        self.begin_drain(slot);
        Ok(())
    }

    /// Ends every stream still active (end of trace).
    pub fn end_all(&mut self) {
        let slots: Vec<usize> = std::mem::take(&mut self.active).into_values().collect();
        for slot in slots {
            self.begin_drain(slot);
        }
    }

    fn begin_drain(&mut self, slot: usize) {
        let d = &mut self.streams[slot];
        d.state = StreamState::Draining;
        d.length = Some(d.length.map_or(d.assigned, |len| len.min(d.assigned)));
        let keep = d.fifo.partition_point(|e| e.index < d.assigned);
        let dropped = d.fifo.len() - keep;
        d.fifo.truncate(keep);
        self.stats.wasted += dropped as u64;
        self.stats.ended += 1;
        debug!(stream = %d.id, assigned = d.assigned, dropped, "stream draining");
        self.try_close(slot);
    }

    /// Reconciles a demand access with its element.
    ///
    /// # Arguments
    ///
    /// * `ticket` - Element assigned to the access at rename.
    /// * `addr` - Address the access actually touches.
    ///
    /// # Returns
    ///
    /// * [`StreamOutcome::Hit`] - the element had arrived at the right address.
    /// * [`StreamOutcome::Late`] - the right address is still in flight under the given request.
    /// * [`StreamOutcome::Miss`] - nothing usable was prefetched; younger
    ///   elements are dropped as waste when the address disagrees.
    pub fn consume(&mut self, ticket: StreamTicket, addr: u64) -> StreamOutcome {
        let d = &mut self.streams[ticket.slot];
        d.consumed += 1;
        let index = ticket.index;
        let outcome = match d.position(index) {
            Some(pos) if d.fifo[pos].addr == addr => {
                let element = d.fifo.remove(pos);
                match element.map(|e| e.state) {
                    Some(ElementState::Ready) => StreamOutcome::Hit,
                    Some(ElementState::InFlight(request)) => {
                        if let Some(run_ahead) = d.throttle.on_late() {
                            self.stats.run_ahead_changes += 1;
                            debug!(stream = %d.id, run_ahead, "run-ahead increased");
                        }
                        StreamOutcome::Late(request)
                    }
                    None => StreamOutcome::Miss,
                }
            }
            Some(pos) => {
                let dropped = d.fifo.len() - pos;
                d.fifo.truncate(pos);
                d.next_issue = index + 1;
                if let Pattern::Learned(trainer) = &mut d.pattern {
                    trainer.reset(index, addr);
                }
                self.stats.mispredictions += 1;
                self.stats.wasted += dropped as u64;
                if let Some(run_ahead) = d.throttle.on_waste() {
                    self.stats.run_ahead_changes += 1;
                    debug!(stream = %d.id, run_ahead, "run-ahead decreased");
                }
                debug!(stream = %d.id, index, addr, dropped, "stream misprediction");
                return self.finish_consume(ticket.slot, StreamOutcome::Miss);
            }
            None => {
                if index >= d.next_issue {
                    d.next_issue = index + 1;
                }
                StreamOutcome::Miss
            }
        };
        if let Pattern::Learned(trainer) = &mut d.pattern {
            if trainer.observe(index, addr) && d.state == StreamState::Idle {
                d.state = StreamState::Active;
                debug!(stream = %d.id, index, "stream pattern recognized");
            }
        }
        self.finish_consume(ticket.slot, outcome)
    }

    fn finish_consume(&mut self, slot: usize, outcome: StreamOutcome) -> StreamOutcome {
        match outcome {
            StreamOutcome::Hit => self.stats.hits += 1,
            StreamOutcome::Late(_) => self.stats.late += 1,
            StreamOutcome::Miss => self.stats.misses += 1,
        }
        self.try_close(slot);
        outcome
    }

    /// Releases an element whose demand access was served elsewhere
    /// (store-to-load forwarding). A prefetched element counts as waste.
    pub fn discard(&mut self, ticket: StreamTicket) {
        let d = &mut self.streams[ticket.slot];
        d.consumed += 1;
        if let Some(pos) = d.position(ticket.index) {
            let _ = d.fifo.remove(pos);
            self.stats.wasted += 1;
        } else if ticket.index >= d.next_issue {
            d.next_issue = ticket.index + 1;
        }
        self.try_close(ticket.slot);
    }

    /// Issues this cycle's prefetches through `issue` and samples run-ahead statistics.
    ///
    /// Streams are served in configuration order; at most `prefetch_width`
    /// requests are issued per cycle across all streams. A base stream is
    /// always configured before its dependents, so it is served first.
    ///
    /// # Arguments
    ///
    /// * `now` - Current cycle, used for tracing only.
    /// * `issue` - Sends one prefetch to memory and returns its request id.
    pub fn tick(&mut self, now: Cycle, issue: &mut dyn FnMut(MemRequest) -> RequestId) {
        let mut budget = if self.mode == StreamMode::Off {
            0
        } else {
            self.config.prefetch_width
        };
        let slots: Vec<usize> = self.live.iter().copied().collect();
        for slot in slots {
            while budget > 0 && self.streams[slot].may_issue() {
                if !self.base_arrived(slot, self.streams[slot].next_issue) {
                    self.stats.dependent_waits += 1;
                    break;
                }
                let d = &mut self.streams[slot];
                let index = d.next_issue;
                let Some(addr) = d.address_of(index) else {
                    break;
                };
                let request = issue(MemRequest {
                    addr,
                    size: d.decl.elem_size,
                    kind: MemKind::Prefetch,
                });
                d.fifo.push_back(Element {
                    index,
                    addr,
                    state: ElementState::InFlight(request),
                });
                d.next_issue += 1;
                d.in_flight += 1;
                let _ = self.requests.insert(request, (slot, index));
                self.stats.prefetches_issued += 1;
                budget -= 1;
                tracing::trace!(stream = %d.id, index, addr, %request, now, "prefetch issued");
            }
            let d = &self.streams[slot];
            if matches!(d.state, StreamState::Active | StreamState::Draining) {
                let run_ahead = d.throttle.run_ahead();
                self.stats.run_ahead_samples += 1;
                self.stats.run_ahead_total += run_ahead as u64;
                self.stats.peak_run_ahead = self.stats.peak_run_ahead.max(run_ahead);
            }
            self.stats.peak_outstanding = self.stats.peak_outstanding.max(d.fifo.len());
        }
    }

    /// Returns true if element `index` of the stream in `slot` may be
    /// prefetched: the stream has no base, or the base element has arrived.
    fn base_arrived(&self, slot: usize, index: u64) -> bool {
        self.streams[slot]
            .base_slot
            .is_none_or(|base| self.streams[base].arrived.contains(index))
    }

    /// Marks a prefetch as arrived.
    ///
    /// # Arguments
    ///
    /// * `request` - Completed memory request.
    ///
    /// # Returns
    ///
    /// `false` if the request is not a prefetch this engine issued.
    pub fn on_complete(&mut self, request: RequestId) -> bool {
        let Some((slot, index)) = self.requests.remove(&request) else {
            return false;
        };
        let d = &mut self.streams[slot];
        d.in_flight = d.in_flight.saturating_sub(1);
        if let Some(pos) = d.position(index) {
            if d.fifo[pos].state == ElementState::InFlight(request) {
                d.fifo[pos].state = ElementState::Ready;
                d.arrived.insert(index);
            }
        }
        self.try_close(slot);
        true
    }

    /// Records that the demand access holding `ticket` has its data,
    /// whether it hit, waited on a late prefetch, or went to memory.
    pub fn mark_arrived(&mut self, ticket: StreamTicket) {
        if let Some(d) = self.streams.get_mut(ticket.slot) {
            d.arrived.insert(ticket.index);
        }
    }

    fn try_close(&mut self, slot: usize) {
        let d = &mut self.streams[slot];
        if !d.can_close() {
            return;
        }
        d.state = StreamState::Closed;
        let leftover = d.fifo.len();
        d.fifo.clear();
        self.stats.wasted += leftover as u64;
        self.stats.closed += 1;
        let _ = self.live.remove(&slot);
        debug!(stream = %d.id, slot, leftover, "stream closed");
    }

    /// Descriptor of the active (not ended) stream with this id.
    pub fn stream(&self, id: StreamId) -> Option<&StreamDescriptor> {
        self.active.get(&id).map(|&slot| &self.streams[slot])
    }

    /// Descriptor in `slot`, whatever its state.
    pub fn descriptor(&self, slot: usize) -> Option<&StreamDescriptor> {
        self.streams.get(slot)
    }

    /// Issued, unconsumed elements summed over all live streams.
    pub fn outstanding(&self) -> usize {
        self.live.iter().map(|&slot| self.streams[slot].fifo.len()).sum()
    }

    /// Number of streams not yet closed.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Returns true once every stream has closed.
    pub fn is_quiescent(&self) -> bool {
        self.live.is_empty()
    }

    /// Counters collected so far.
    pub const fn stats(&self) -> &StreamStats {
        &self.stats
    }
}
