//! In-flight instruction state.

use std::fmt;
use std::sync::Arc;

use crate::common::{Cycle, InstId, OpClass};
use crate::core::units::fu_pool::FuHandle;
use crate::core::units::stream::StreamTicket;
use crate::trace::{InstructionRecord, MemAccess};

/// Where an in-flight instruction currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// In the fetch queue.
    Fetch,
    /// In the decode queue.
    Decode,
    /// Renamed; waiting in the instruction queue for operands or a unit.
    Issue,
    /// Occupying a functional unit.
    Execute,
    /// Address generated; waiting on memory, a prefetch, or store ordering.
    Memory,
    /// Finished; waiting to commit.
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::Issue => "issue",
            Self::Execute => "execute",
            Self::Memory => "memory",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Mutable wrapper around a trace record while it moves through the pipeline.
///
/// Created at fetch and dropped at commit. The record itself is shared
/// read-only.
#[derive(Clone, Debug)]
pub struct InflightInst {
    record: Arc<InstructionRecord>,
    stage: Stage,
    history: Vec<(Stage, Cycle)>,
    /// Stream element assigned at rename, for stream-tagged accesses.
    pub stream: Option<StreamTicket>,
    /// Functional unit held while executing.
    pub fu: Option<FuHandle>,
}

impl InflightInst {
    /// Wraps a freshly fetched record.
    pub fn new(record: Arc<InstructionRecord>, now: Cycle) -> Self {
        Self {
            record,
            stage: Stage::Fetch,
            history: vec![(Stage::Fetch, now)],
            stream: None,
            fu: None,
        }
    }

    /// Trace id.
    pub fn id(&self) -> InstId {
        self.record.id
    }

    /// Operation class.
    pub fn class(&self) -> OpClass {
        self.record.op
    }

    /// Memory access, if any.
    pub fn mem(&self) -> Option<&MemAccess> {
        self.record.mem.as_ref()
    }

    /// The underlying trace record.
    pub fn record(&self) -> &InstructionRecord {
        &self.record
    }

    /// Current stage.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves to `stage`, recording the entry cycle.
    pub fn advance(&mut self, stage: Stage, now: Cycle) {
        self.stage = stage;
        self.history.push((stage, now));
    }

    /// Cycle at which the instruction first entered `stage`.
    pub fn entered(&self, stage: Stage) -> Option<Cycle> {
        self.history
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|&(_, cycle)| cycle)
    }

    /// Cycle at which the instruction entered its current stage.
    pub fn entered_current(&self) -> Cycle {
        self.history.last().map_or(0, |&(_, cycle)| cycle)
    }
}
