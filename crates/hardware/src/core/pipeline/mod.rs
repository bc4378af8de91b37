//! Instruction window and pipeline stages.
//!
//! This module contains the bounded structures in-flight instructions occupy and
//! the stage functions that move them. It includes the following components:
//! 1. **In-flight state:** The per-instruction wrapper and its current [`inst::Stage`].
//! 2. **Queues:** Delay-aware fetch and decode queues.
//! 3. **Reorder Buffer:** Program-order retirement.
//! 4. **Instruction Queue:** Oldest-ready-first selection.
//! 5. **Store Queue:** Store-to-load forwarding and conservative load ordering.
//! 6. **Scoreboard:** Producer completion tracking by instruction id.
//! 7. **Stages:** Fetch, decode, rename, issue/execute/writeback, and commit.

/// In-flight instruction wrapper and pipeline stage enum.
pub mod inst;

/// Instruction queue.
pub mod issue_queue;

/// Bounded delay-aware stage queue (fetch and decode queues).
pub mod queue;

/// Reorder buffer.
pub mod rob;

/// Id-based producer scoreboard.
pub mod scoreboard;

/// Pipeline stage implementations.
pub mod stages;

/// Store queue.
pub mod store_queue;
