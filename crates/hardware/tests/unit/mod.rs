//! # Scenario Tests
//!
//! Each module drives the simulator end to end for one subsystem.

/// Configuration parsing and validation.
pub mod config;

/// Window, ordering, and backpressure behaviour of the pipeline.
pub mod pipeline;


/// Statistics reporting.
pub mod stats;

/// Stream prefetch engine behaviour.
pub mod stream;
