//! Instruction records as produced by a trace.

use serde::{Deserialize, Serialize};

use crate::common::{InstId, OpClass, StreamId, TraceError};

/// Memory access carried by a load or store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemAccess {
    /// Byte address.
    pub addr: u64,
    /// Access size in bytes; must be non-zero.
    pub size: u32,
    /// Stream this access belongs to, if the trace declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamId>,
}

/// Declaration of a memory-access stream.
///
/// `history` lists the exact future element addresses when the trace knows them;
/// otherwise the pattern is `base + index * stride`. A stream with a
/// `base_stream` is indirect: element `i` may only be prefetched once element
/// `i` of the base stream has arrived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDecl {
    /// Stream id, unique among streams that are not ended.
    pub id: StreamId,
    /// Address of element 0.
    pub base: u64,
    /// Byte distance between consecutive elements.
    #[serde(default)]
    pub stride: i64,
    /// Element size in bytes.
    pub elem_size: u32,
    /// Number of elements, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// Recorded element addresses in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<u64>,
    /// Live stream whose elements this stream's addresses are derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_stream: Option<StreamId>,
}

/// Stream lifecycle marker attached to an instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    /// Declares a new stream.
    Configure(StreamDecl),
    /// Ends a stream; no younger access may reference it.
    End(StreamId),
}

/// Predicted and actual direction of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOutcome {
    /// Direction the front end predicted.
    pub predicted_taken: bool,
    /// Direction the branch actually took.
    pub taken: bool,
}

impl BranchOutcome {
    /// Returns true if the prediction was wrong.
    pub const fn mispredicted(self) -> bool {
        self.predicted_taken != self.taken
    }
}

/// One instruction of the trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    /// Sequence id; strictly increasing in program order.
    pub id: InstId,
    /// Operation class.
    #[serde(default)]
    pub op: OpClass,
    /// Older instructions whose results this one consumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<InstId>,
    /// Memory access, required for loads and stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<MemAccess>,
    /// Stream lifecycle event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_event: Option<StreamEvent>,
    /// Branch outcome, for branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BranchOutcome>,
}

impl InstructionRecord {
    /// Creates a record of the given class with no dependencies.
    pub const fn new(id: InstId, op: OpClass) -> Self {
        Self {
            id,
            op,
            deps: Vec::new(),
            mem: None,
            stream_event: None,
            outcome: None,
        }
    }

    /// Returns true for a branch whose prediction was wrong.
    pub fn is_mispredicted(&self) -> bool {
        self.outcome.is_some_and(BranchOutcome::mispredicted)
    }

    /// Checks the record on its own, independent of its neighbours.
    pub fn validate(&self) -> Result<(), TraceError> {
        if let Some(&dep) = self.deps.iter().find(|&&dep| dep >= self.id) {
            return Err(TraceError::DependencyOutOfRange { id: self.id, dep });
        }
        match (&self.mem, self.op.is_mem()) {
            (Some(access), true) if access.size > 0 => {}
            (_, true) => return Err(TraceError::BadMemAccess { id: self.id }),
            (Some(_), false) => {
                return Err(TraceError::UnexpectedMemAccess {
                    id: self.id,
                    class: self.op,
                });
            }
            (None, false) => {}
        }
        if let Some(StreamEvent::Configure(decl)) = &self.stream_event {
            if decl.elem_size == 0 {
                return Err(TraceError::BadStreamDecl {
                    id: self.id,
                    stream: decl.id,
                });
            }
        }
        Ok(())
    }
}
