//! Simulation driver.
//!
//! Owns the core, the trace reader, and the memory system, and advances them
//! one cycle at a time. The progress watchdog lives here as well.

/// Cycle driver and memory completion routing.
pub mod simulator;

/// Consecutive-idle-cycle watchdog.
pub mod watchdog;

pub use simulator::{CycleReport, Simulator};
pub use watchdog::{Verdict, Watchdog};
