//! Latency models for the bundled memory system.
//!
//! This module provides:
//! 1. **SimpleController:** Fixed latency per access (no row-buffer modeling).
//! 2. **DramController:** Row-buffer-aware latency (CAS, RAS, precharge) for DRAM-style timing.

use crate::common::Cycle;

/// Reports how many cycles an access to a given address takes.
pub trait MemoryController {
    /// Returns the latency of an access to `addr`, updating any internal row state.
    ///
    /// # Arguments
    ///
    /// * `addr` - Byte address of the access.
    ///
    /// # Returns
    ///
    /// Cycles from issue until the data is available.
    fn access_latency(&mut self, addr: u64) -> Cycle;
}

/// Fixed-latency controller; every access takes the same number of cycles.
#[derive(Clone, Copy, Debug)]
pub struct SimpleController {
    latency: Cycle,
}

impl SimpleController {
    /// Creates a controller with the given fixed latency in cycles.
    pub const fn new(latency: Cycle) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64) -> Cycle {
        self.latency
    }
}

/// DRAM-style controller with a single open row.
///
/// A row hit costs `t_cas`; opening a row on an idle bank costs `t_ras + t_cas`;
/// a row conflict additionally pays `t_pre`.
#[derive(Clone, Copy, Debug)]
pub struct DramController {
    open_row: Option<u64>,
    t_cas: Cycle,
    t_ras: Cycle,
    t_pre: Cycle,
    row_mask: u64,
}

impl DramController {
    /// Row size in bytes.
    pub const ROW_BYTES: u64 = 2048;

    /// Creates a controller with no row open.
    pub const fn new(t_cas: Cycle, t_ras: Cycle, t_pre: Cycle) -> Self {
        Self {
            open_row: None,
            t_cas,
            t_ras,
            t_pre,
            row_mask: !(Self::ROW_BYTES - 1),
        }
    }
}

impl MemoryController for DramController {
    fn access_latency(&mut self, addr: u64) -> Cycle {
        let row = addr & self.row_mask;
        let latency = match self.open_row {
            Some(open) if open == row => self.t_cas,
            Some(_) => self.t_pre + self.t_ras + self.t_cas,
            None => self.t_ras + self.t_cas,
        };
        self.open_row = Some(row);
        latency
    }
}
