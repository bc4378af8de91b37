//! Per-stream state: lifecycle, address pattern, and prefetched elements.

use std::collections::{BTreeSet, VecDeque};

use super::throttle::Throttle;
use crate::common::{InstId, StreamId};
use crate::memory::RequestId;
use crate::trace::StreamDecl;

/// Lifecycle of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Configured; pattern not recognized yet.
    Idle,
    /// Issuing prefetches.
    Active,
    /// Ended; serving already assigned elements only.
    Draining,
    /// Finished; all prefetches completed and every assigned element consumed.
    Closed,
}

/// State of a prefetched element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementState {
    /// Request still outstanding.
    InFlight(RequestId),
    /// Data has arrived.
    Ready,
}

/// A prefetched, not yet consumed element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element {
    /// Position in the stream.
    pub index: u64,
    /// Predicted address.
    pub addr: u64,
    /// Arrival state.
    pub state: ElementState,
}

/// Saturating stride-confidence ceiling.
const MAX_CONFIDENCE: u8 = 3;

/// Confidence needed before a throttled stream starts prefetching.
const ACTIVE_CONFIDENCE: u8 = 2;

/// Stride learned from demand accesses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrideTrainer {
    stride: Option<i64>,
    confidence: u8,
    /// Most recent (index, address) observed in program order.
    anchor: Option<(u64, u64)>,
}

impl StrideTrainer {
    /// Feeds one demand access. Returns true if the stride is now trusted.
    pub fn observe(&mut self, index: u64, addr: u64) -> bool {
        match self.anchor {
            Some((prev_index, prev_addr)) if index > prev_index => {
                let distance = i64::try_from(index - prev_index).unwrap_or(i64::MAX);
                let delta = addr.wrapping_sub(prev_addr) as i64;
                let candidate = (delta % distance == 0).then(|| delta / distance);
                match (self.stride, candidate) {
                    (Some(s), Some(c)) if s == c => {
                        self.confidence = (self.confidence + 1).min(MAX_CONFIDENCE);
                    }
                    (_, c) if self.confidence > 0 => {
                        self.confidence -= 1;
                        if self.confidence == 0 {
                            self.stride = c;
                            self.confidence = u8::from(c.is_some());
                        }
                    }
                    (_, c) => {
                        self.stride = c;
                        self.confidence = u8::from(c.is_some());
                    }
                }
                self.anchor = Some((index, addr));
            }
            Some(_) => {}
            None => self.anchor = Some((index, addr)),
        }
        self.is_trusted()
    }

    /// Forgets the learned stride, keeping the latest anchor.
    pub fn reset(&mut self, index: u64, addr: u64) {
        self.stride = None;
        self.confidence = 0;
        self.anchor = Some((index, addr));
    }

    /// Returns true once the stride has enough confidence to prefetch on.
    pub const fn is_trusted(&self) -> bool {
        self.confidence >= ACTIVE_CONFIDENCE && self.stride.is_some()
    }

    /// Predicted address of `index`, extrapolated from the anchor.
    pub fn predict(&self, index: u64) -> Option<u64> {
        let stride = self.stride?;
        let (anchor_index, anchor_addr) = self.anchor?;
        let steps = index.wrapping_sub(anchor_index) as i64;
        Some(anchor_addr.wrapping_add(steps.wrapping_mul(stride) as u64))
    }
}

/// Element indices whose data has arrived: a dense prefix plus stragglers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arrivals {
    /// Every index below this has arrived.
    floor: u64,
    /// Arrived indices at or above `floor`.
    above: BTreeSet<u64>,
}

impl Arrivals {
    /// Records the arrival of element `index`.
    pub fn insert(&mut self, index: u64) {
        if index < self.floor {
            return;
        }
        let _ = self.above.insert(index);
        while self.above.remove(&self.floor) {
            self.floor += 1;
        }
    }

    /// Returns true if element `index` has arrived.
    pub fn contains(&self, index: u64) -> bool {
        index < self.floor || self.above.contains(&index)
    }

    /// Number of out-of-order arrivals held beyond the dense prefix.
    pub fn stragglers(&self) -> usize {
        self.above.len()
    }
}

/// Address source of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Exact addresses known in advance.
    Oracle,
    /// Addresses predicted from demand accesses.
    Learned(StrideTrainer),
}

/// One configured stream.
#[derive(Clone, Debug)]
pub struct StreamDescriptor {
    /// Stream id from the trace.
    pub id: StreamId,
    /// Instruction that configured it.
    pub configured_by: InstId,
    /// Declaration as given by the trace.
    pub decl: StreamDecl,
    /// Lifecycle state.
    pub state: StreamState,
    /// Address source.
    pub pattern: Pattern,
    /// Run-ahead policy.
    pub throttle: Throttle,
    /// Issued, unconsumed elements in index order.
    pub fifo: VecDeque<Element>,
    /// Next element index to prefetch.
    pub next_issue: u64,
    /// Element indices handed to demand accesses so far.
    pub assigned: u64,
    /// Assigned elements whose demand access has been reconciled.
    pub consumed: u64,
    /// Prefetch requests not yet completed, including discarded ones.
    pub in_flight: usize,
    /// Number of elements, if bounded.
    pub length: Option<u64>,
    /// Slot of the stream this one's addresses depend on.
    pub base_slot: Option<usize>,
    /// Elements whose data has arrived, by prefetch or by demand.
    pub arrived: Arrivals,
}

impl StreamDescriptor {
    /// Creates a descriptor from its declaration.
    pub fn new(decl: StreamDecl, configured_by: InstId, oracle: bool, throttle: Throttle) -> Self {
        let history_len = (!decl.history.is_empty()).then_some(decl.history.len() as u64);
        let length = match (decl.length, history_len) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let (state, pattern) = if oracle {
            (StreamState::Active, Pattern::Oracle)
        } else {
            (StreamState::Idle, Pattern::Learned(StrideTrainer::default()))
        };
        Self {
            id: decl.id,
            configured_by,
            decl,
            state,
            pattern,
            throttle,
            fifo: VecDeque::new(),
            next_issue: 0,
            assigned: 0,
            consumed: 0,
            in_flight: 0,
            length,
            base_slot: None,
            arrived: Arrivals::default(),
        }
    }

    /// Address of element `index` according to the current pattern.
    pub fn address_of(&self, index: u64) -> Option<u64> {
        match &self.pattern {
            Pattern::Oracle => {
                let recorded = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.decl.history.get(i).copied());
                Some(recorded.unwrap_or_else(|| {
                    let offset = (index as i64).wrapping_mul(self.decl.stride);
                    self.decl.base.wrapping_add(offset as u64)
                }))
            }
            Pattern::Learned(trainer) => trainer.predict(index),
        }
    }

    /// Returns true while the stream may issue new prefetches.
    pub fn may_issue(&self) -> bool {
        matches!(self.state, StreamState::Active | StreamState::Draining)
            && self.length.is_none_or(|len| self.next_issue < len)
            && self.fifo.len() < self.throttle.run_ahead()
            && match &self.pattern {
                Pattern::Oracle => true,
                Pattern::Learned(trainer) => trainer.is_trusted(),
            }
    }

    /// Position of element `index` in the FIFO.
    pub fn position(&self, index: u64) -> Option<usize> {
        self.fifo.binary_search_by_key(&index, |e| e.index).ok()
    }

    /// Returns true once a draining stream has nothing left to wait for.
    pub fn can_close(&self) -> bool {
        self.state == StreamState::Draining
            && self.in_flight == 0
            && self.consumed == self.assigned
    }
}
