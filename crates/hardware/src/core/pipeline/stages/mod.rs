//! Pipeline stage implementations.
//!
//! Each stage is a free function over the [`Core`](crate::core::Core) context,
//! called once per cycle in commit-to-fetch order. It includes:
//! 1. **Commit:** Retires completed instructions from the ROB head in program order.
//! 2. **Issue/Execute/Writeback:** Finishes operations, resolves memory accesses,
//!    and issues ready instructions oldest first.
//! 3. **Rename:** Allocates ROB, IQ, and store queue entries and applies stream events.
//! 4. **Decode:** Moves instructions from the fetch queue to the decode queue.
//! 5. **Fetch:** Pulls records from the trace into the fetch queue.
//!
//! Stages spend from a [`Budget`](crate::core::Budget) snapshotted at cycle start.

/// Commit stage implementation.
pub mod commit;

/// Instruction decode stage implementation.
pub mod decode;

/// Instruction fetch stage implementation.
pub mod fetch;

/// Issue/execute/writeback stage implementation.
pub mod iew;

/// Rename (dispatch) stage implementation.
pub mod rename;

/// Commit stage entry point.
pub use commit::commit_stage;
/// Decode stage entry point.
pub use decode::decode_stage;
/// Fetch stage entry point.
pub use fetch::fetch_stage;
/// Issue/execute/writeback stage entry point.
pub use iew::iew_stage;
/// Rename stage entry point.
pub use rename::rename_stage;
