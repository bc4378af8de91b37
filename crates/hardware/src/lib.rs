//! Trace-driven out-of-order core timing model.
//!
//! This crate replays an instruction trace through a cycle-approximate model of
//! an out-of-order core with the following:
//! 1. **Core:** Fetch, decode, rename, issue/execute/writeback, and commit stages
//!    over bounded queues, a reorder buffer, an instruction queue, and a store queue.
//! 2. **Units:** A functional unit pool and a stream prefetch engine with oracle,
//!    static, and adaptive run-ahead throttling.
//! 3. **Memory:** The request/completion interface plus bundled latency models.
//! 4. **Simulation:** The per-cycle driver, progress watchdog, and statistics.
//!
//! No architectural state is modeled; the trace carries dependencies, memory
//! addresses, and stream annotations.

/// Common types and errors (cycles, ids, op classes, error enums).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Out-of-order core (pipeline structures, stages, functional units, stream engine).
pub mod core;
/// Memory request interface and bundled latency models.
pub mod memory;
/// Cycle driver and watchdog.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;
/// Instruction records and trace sources.
pub mod trace;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Top-level error returned by the simulator.
pub use crate::common::SimError;
/// Cycle driver; construct with `Simulator::new` or `Simulator::with_timed_memory`.
pub use crate::sim::Simulator;
/// Final and intermediate statistics.
pub use crate::stats::SimStats;
/// One trace record.
pub use crate::trace::InstructionRecord;
