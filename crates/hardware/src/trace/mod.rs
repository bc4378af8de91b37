//! Trace boundary.
//!
//! The model consumes an ordered sequence of [`InstructionRecord`]s. It never
//! parses trace files itself; anything implementing [`TraceSource`] (including
//! any iterator over records) can drive a run.

/// Instruction record, memory access, stream event, and branch outcome types.
pub mod record;

/// Trace source trait and the validating reader used by the fetch stage.
pub mod source;

pub use record::{BranchOutcome, InstructionRecord, MemAccess, StreamDecl, StreamEvent};
pub use source::{TraceReader, TraceSource};
