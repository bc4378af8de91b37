//! Identifier and classification types.
//!
//! Every in-flight structure in the model is keyed by one of these types.
//! They are deliberately plain `Copy` newtypes so they can be stored in
//! queues, hashed, and compared for program order without indirection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A simulated clock cycle.
pub type Cycle = u64;

/// Sequence id of an instruction as emitted by the trace.
///
/// Ids are strictly increasing in program order, so comparing two ids
/// compares their age: the smaller id is the older instruction.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstId(pub u64);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a memory-access stream declared by the trace.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Operation class of an instruction.
///
/// The class selects the functional unit type the instruction occupies
/// while executing. `Nop` needs no unit and completes as soon as it issues.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum OpClass {
    /// No execution resource required.
    Nop,
    /// Integer add/logic/shift/compare and branches.
    #[default]
    IntAlu,
    /// Integer multiply.
    IntMult,
    /// Integer divide.
    IntDiv,
    /// Floating-point add/compare/convert.
    FloatAdd,
    /// Floating-point multiply and fused multiply-add.
    FloatMult,
    /// Floating-point divide and square root.
    FloatDiv,
    /// Memory read (load address generation and cache port).
    MemRead,
    /// Memory write (store address generation and cache port).
    MemWrite,
}

impl OpClass {
    /// Every operation class, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Nop,
        Self::IntAlu,
        Self::IntMult,
        Self::IntDiv,
        Self::FloatAdd,
        Self::FloatMult,
        Self::FloatDiv,
        Self::MemRead,
        Self::MemWrite,
    ];

    /// Returns true for loads.
    #[inline]
    pub const fn is_load(self) -> bool {
        matches!(self, Self::MemRead)
    }

    /// Returns true for stores.
    #[inline]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::MemWrite)
    }

    /// Returns true for loads and stores.
    #[inline]
    pub const fn is_mem(self) -> bool {
        self.is_load() || self.is_store()
    }

    /// Returns true if the class occupies a functional unit.
    #[inline]
    pub const fn needs_unit(self) -> bool {
        !matches!(self, Self::Nop)
    }
}

/// Kind of a request sent to the external memory system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemKind {
    /// Demand load.
    Read,
    /// Store drained after commit.
    Write,
    /// Speculative stream-engine prefetch.
    Prefetch,
}
