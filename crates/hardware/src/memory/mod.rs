//! Memory system boundary.
//!
//! The core never models caches or DRAM itself. It hands requests to a
//! [`MemoryInterface`] and later drains the ids of the requests that finished.
//! This module provides:
//! 1. **Protocol types:** [`MemRequest`], [`RequestId`], and [`Completion`].
//! 2. **The interface trait:** implemented by any external memory system (and by test mocks).
//! 3. **A bundled model:** [`TimedMemory`], which delivers completions after a latency
//!    chosen by a [`controller::MemoryController`].

/// Latency models used by [`TimedMemory`].
pub mod controller;

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use crate::common::{Cycle, MemKind};
use crate::config::{MemoryConfig, MemoryController as ControllerKind};

use self::controller::{DramController, MemoryController, SimpleController};

/// Identifier the memory system assigns to an issued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req{}", self.0)
    }
}

/// A request sent to the memory system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRequest {
    /// Byte address.
    pub addr: u64,
    /// Access size in bytes.
    pub size: u32,
    /// Demand read, committed store, or prefetch.
    pub kind: MemKind,
}

/// A finished request reported back to the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Id returned by [`MemoryInterface::issue_request`].
    pub request: RequestId,
    /// Cycle at which the data became available.
    pub at: Cycle,
}

/// External memory system contract.
///
/// Completions must be reported at a cycle no earlier than the one the request
/// was issued in; the simulator treats anything else as a fatal protocol error.
pub trait MemoryInterface {
    /// Accepts a request at cycle `now` and returns its id.
    ///
    /// # Arguments
    ///
    /// * `request` - Address, size and kind of the access.
    /// * `now` - Cycle the request is issued in.
    ///
    /// # Returns
    ///
    /// An id unique among requests still outstanding.
    fn issue_request(&mut self, request: MemRequest, now: Cycle) -> RequestId;

    /// Returns every request that completed at or before `now` and was not yet reported.
    ///
    /// # Arguments
    ///
    /// * `now` - Current cycle.
    ///
    /// # Returns
    ///
    /// Completions with `at <= now`, each reported exactly once.
    fn drain_completions(&mut self, now: Cycle) -> Vec<Completion>;
}

impl<M: MemoryInterface + ?Sized> MemoryInterface for Box<M> {
    fn issue_request(&mut self, request: MemRequest, now: Cycle) -> RequestId {
        (**self).issue_request(request, now)
    }

    fn drain_completions(&mut self, now: Cycle) -> Vec<Completion> {
        (**self).drain_completions(now)
    }
}

/// Memory system that completes every request after a controller-defined latency.
///
/// Completions are reported in cycle order; requests finishing in the same
/// cycle are reported in id order.
#[derive(Debug)]
pub struct TimedMemory<C> {
    controller: C,
    next_id: u64,
    in_flight: BinaryHeap<Reverse<(Cycle, RequestId)>>,
}

impl<C: MemoryController> TimedMemory<C> {
    /// Wraps a latency model.
    pub const fn new(controller: C) -> Self {
        Self {
            controller,
            next_id: 0,
            in_flight: BinaryHeap::new(),
        }
    }

    /// Number of requests issued but not yet reported complete.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

impl<C: MemoryController> MemoryInterface for TimedMemory<C> {
    fn issue_request(&mut self, request: MemRequest, now: Cycle) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let latency = self.controller.access_latency(request.addr).max(1);
        self.in_flight.push(Reverse((now + latency, id)));
        id
    }

    fn drain_completions(&mut self, now: Cycle) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Some(Reverse((at, request))) = self.in_flight.peek().copied() {
            if at > now {
                break;
            }
            let _ = self.in_flight.pop();
            done.push(Completion { request, at });
        }
        done
    }
}

/// Builds the bundled memory model selected by `config`.
pub fn from_config(config: &MemoryConfig) -> Box<dyn MemoryInterface> {
    match config.controller {
        ControllerKind::Simple => Box::new(TimedMemory::new(SimpleController::new(config.latency))),
        ControllerKind::Dram => Box::new(TimedMemory::new(DramController::new(
            config.t_cas,
            config.t_ras,
            config.t_pre,
        ))),
    }
}
