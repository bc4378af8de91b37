//! Error definitions for the timing model.
//!
//! This module defines the fatal error taxonomy of a simulation run. It provides:
//! 1. **Configuration errors:** Invalid capacities, widths, or engine parameters,
//!    rejected when the simulator is constructed.
//! 2. **Trace errors:** Malformed instruction records, rejected when fetched or renamed.
//! 3. **Simulation errors:** The top-level error returned by the cycle loop, including
//!    the progress watchdog and memory-protocol violations.
//!
//! Queue-full and functional-unit-busy conditions are backpressure, not errors, and
//! never appear here.

use std::sync::Arc;

use thiserror::Error;

use super::data::{Cycle, InstId, OpClass, StreamId};
use crate::core::pipeline::inst::Stage;
use crate::memory::RequestId;

/// Invalid configuration value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A width, capacity, or count that must be positive was zero.
    #[error("`{field}` must be greater than zero")]
    Zero {
        /// Dotted path of the offending field.
        field: &'static str,
    },

    /// The functional unit pool lists the same class twice.
    #[error("functional unit class {0:?} is configured more than once")]
    DuplicateUnit(OpClass),

    /// A functional unit entry for the `Nop` class was given.
    #[error("`Nop` instructions do not use a functional unit")]
    NopUnit,

    /// The adaptive throttle starts above the run-ahead ceiling.
    #[error("initial run-ahead {initial} exceeds run-ahead length {max}")]
    InitialRunAhead {
        /// Configured starting run-ahead.
        initial: usize,
        /// Configured run-ahead ceiling.
        max: usize,
    },

    /// The configuration text could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ParseError),
}

/// JSON parse failure, shared so that errors stay cheap to clone.
///
/// Two parse errors compare equal when they report the same message at the
/// same position.
#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct ParseError(Arc<serde_json::Error>);

impl ParseError {
    /// Underlying JSON error.
    pub fn json(&self) -> &serde_json::Error {
        &self.0
    }
}

impl PartialEq for ParseError {
    fn eq(&self, other: &Self) -> bool {
        self.0.line() == other.0.line()
            && self.0.column() == other.0.column()
            && self.0.to_string() == other.0.to_string()
    }
}

impl Eq for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        Self(Arc::new(e))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.into())
    }
}

/// Malformed trace content.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TraceError {
    /// Instruction ids must be strictly increasing.
    #[error("instruction {id} does not follow {prev} in program order")]
    NonMonotonicId {
        /// Id of the previously emitted record.
        prev: InstId,
        /// Offending id.
        id: InstId,
    },

    /// A dependency names the instruction itself or a younger one.
    #[error("instruction {id} depends on {dep}, which is not older")]
    DependencyOutOfRange {
        /// Consumer id.
        id: InstId,
        /// Offending producer id.
        dep: InstId,
    },

    /// A load or store has no memory access, or a zero-sized one.
    #[error("memory instruction {id} has no valid access")]
    BadMemAccess {
        /// Offending id.
        id: InstId,
    },

    /// A non-memory instruction carries a memory access.
    #[error("instruction {id} of class {class:?} carries a memory access")]
    UnexpectedMemAccess {
        /// Offending id.
        id: InstId,
        /// Its operation class.
        class: OpClass,
    },

    /// The instruction needs a functional unit class that the pool does not have.
    #[error("instruction {id} needs a {class:?} unit but none is configured")]
    NoFunctionalUnit {
        /// Offending id.
        id: InstId,
        /// Requested class.
        class: OpClass,
    },

    /// A stream id is configured while a previous instance is still active.
    #[error("stream {stream} configured by {id} is already active")]
    DuplicateStream {
        /// Configuring instruction.
        id: InstId,
        /// Stream id.
        stream: StreamId,
    },

    /// A stream access or end names a stream that is not active.
    #[error("instruction {id} references inactive stream {stream}")]
    UnknownStream {
        /// Referencing instruction.
        id: InstId,
        /// Stream id.
        stream: StreamId,
    },

    /// A dependent stream names a base stream that is not active.
    #[error("stream {stream} configured by {id} depends on inactive stream {base}")]
    UnknownBaseStream {
        /// Configuring instruction.
        id: InstId,
        /// Dependent stream id.
        stream: StreamId,
        /// Missing base stream id.
        base: StreamId,
    },

    /// A stream declaration is unusable (zero element size).
    #[error("stream {stream} declared by {id} has a zero element size")]
    BadStreamDecl {
        /// Declaring instruction.
        id: InstId,
        /// Stream id.
        stream: StreamId,
    },
}

/// Fatal simulation error.
///
/// Every variant aborts the run; the model never retries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed trace.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// The progress watchdog fired.
    #[error(
        "no progress for {idle_cycles} cycles at cycle {cycle}: instruction {inst} stalled in {stage}"
    )]
    Deadlock {
        /// Oldest in-flight instruction.
        inst: InstId,
        /// Where it is stuck.
        stage: Stage,
        /// Cycle at which the watchdog fired.
        cycle: Cycle,
        /// Consecutive cycles without progress.
        idle_cycles: u64,
    },

    /// The watchdog fired with no instruction in flight.
    #[error(
        "no progress for {idle_cycles} cycles at cycle {cycle}: {pending_requests} memory requests and {live_streams} streams never drained"
    )]
    Hang {
        /// Cycle at which the watchdog fired.
        cycle: Cycle,
        /// Consecutive cycles without progress.
        idle_cycles: u64,
        /// Memory requests still outstanding.
        pending_requests: usize,
        /// Streams not yet closed.
        live_streams: usize,
    },

    /// The run exceeded the configured hard cycle bound.
    #[error("cycle limit {limit} reached")]
    CycleLimit {
        /// Configured bound.
        limit: Cycle,
    },

    /// The memory system completed a request id the core never issued.
    #[error("completion for unknown memory request {0:?}")]
    UnknownRequest(RequestId),

    /// The memory system completed a request before it was issued.
    #[error("memory request {request:?} issued at cycle {issued} completed at cycle {completed}")]
    EarlyCompletion {
        /// Request id.
        request: RequestId,
        /// Issue cycle.
        issued: Cycle,
        /// Reported completion cycle.
        completed: Cycle,
    },
}
