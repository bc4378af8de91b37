//! Common types shared by every part of the timing model.
//!
//! This module provides the small vocabulary the rest of the crate is written in:
//! 1. **Identifiers:** Simulation cycles, trace instruction ids, and stream ids.
//! 2. **Operation classes:** The execution resource an instruction needs.
//! 3. **Memory access kinds:** Demand reads/writes versus speculative prefetches.
//! 4. **Error Handling:** Configuration, trace, and fatal simulation errors.

/// Identifier and classification types (cycles, ids, op classes, access kinds).
pub mod data;

/// Error types for configuration, trace validation, and fatal run conditions.
pub mod error;

pub use data::{Cycle, InstId, MemKind, OpClass, StreamId};
pub use error::{ConfigError, ParseError, SimError, TraceError};
