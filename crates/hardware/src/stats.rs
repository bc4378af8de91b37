//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for a run. It provides:
//! 1. **Cycle and IPC:** Total cycles, committed instructions, and derived metrics (IPC, CPI).
//! 2. **Instruction mix:** Committed instructions per operation class.
//! 3. **Memory:** Loads issued, forwarded from the store queue, served by streams; stores drained.
//! 4. **Stalls:** Per-reason counts of cycles in which a stage was held back.
//! 5. **Window occupancy:** Per-structure occupancy sampled once per cycle.
//! 6. **Stream engine:** Prefetches issued, hits, late fetches, misses, waste, and run-ahead.
//!
//! Every counter is derived from simulated events only, so two runs of the same
//! trace and configuration produce equal statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::OpClass;

/// Occupancy of one bounded structure, sampled once per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OccupancyStats {
    /// Configured capacity.
    pub capacity: usize,
    /// Number of samples taken.
    pub samples: u64,
    /// Sum of sampled occupancies.
    pub total: u64,
    /// Highest sampled occupancy.
    pub peak: usize,
}

impl OccupancyStats {
    /// Creates an empty record for a structure of the given capacity.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: 0,
            total: 0,
            peak: 0,
        }
    }

    /// Records one sample.
    pub fn sample(&mut self, occupancy: usize) {
        self.samples += 1;
        self.total += occupancy as u64;
        self.peak = self.peak.max(occupancy);
    }

    /// Mean occupancy over all samples.
    pub fn average(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total as f64 / self.samples as f64
        }
    }
}

/// Occupancy-over-time of every window structure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WindowOccupancy {
    /// Fetch queue.
    pub fetch_queue: OccupancyStats,
    /// Decode queue.
    pub decode_queue: OccupancyStats,
    /// Reorder buffer.
    pub rob: OccupancyStats,
    /// Instruction queue.
    pub iq: OccupancyStats,
    /// Store queue.
    pub sq: OccupancyStats,
}

/// Cycles in which a stage could not make its full move, by reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StallStats {
    /// Fetch found the fetch queue full.
    pub fetch_queue_full: u64,
    /// Fetch waited on a mispredicted branch.
    pub fetch_redirect: u64,
    /// Decode found the decode queue full.
    pub decode_queue_full: u64,
    /// Rename found the ROB full.
    pub rob_full: u64,
    /// Rename found the instruction queue full.
    pub iq_full: u64,
    /// Rename found the store queue full.
    pub sq_full: u64,
    /// A ready instruction found no free functional unit.
    pub fu_busy: u64,
    /// A load waited behind an older store.
    pub memory_order: u64,
}

/// Stream engine counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Streams configured.
    pub configured: u64,
    /// Streams configured with a base stream.
    pub dependent_configured: u64,
    /// Streams ended by the trace or by end of trace.
    pub ended: u64,
    /// Streams fully drained.
    pub closed: u64,
    /// Stream elements handed to demand accesses.
    pub elements_assigned: u64,
    /// Prefetch requests issued.
    pub prefetches_issued: u64,
    /// Demand accesses whose element had already arrived.
    pub hits: u64,
    /// Demand accesses whose element was still in flight.
    pub late: u64,
    /// Demand accesses with no prefetched element.
    pub misses: u64,
    /// Prefetched elements discarded unconsumed.
    pub wasted: u64,
    /// Demand addresses that differed from the predicted element address.
    pub mispredictions: u64,
    /// Throttle adjustments to the run-ahead distance.
    pub run_ahead_changes: u64,
    /// Sum of the run-ahead distance over all active stream-cycles.
    pub run_ahead_total: u64,
    /// Number of active stream-cycles sampled.
    pub run_ahead_samples: u64,
    /// Largest run-ahead distance observed.
    pub peak_run_ahead: usize,
    /// Largest number of outstanding elements of any one stream.
    pub peak_outstanding: usize,
    /// Times a dependent stream stopped issuing because its base element had not arrived.
    pub dependent_waits: u64,
}

impl StreamStats {
    /// Demand accesses served by a prefetch, on time or late.
    pub const fn used(&self) -> u64 {
        self.hits + self.late
    }

    /// Mean run-ahead distance over active stream-cycles.
    pub fn average_run_ahead(&self) -> f64 {
        if self.run_ahead_samples == 0 {
            0.0
        } else {
            self.run_ahead_total as f64 / self.run_ahead_samples as f64
        }
    }
}

/// Simulation statistics structure tracking all performance metrics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Total cycles elapsed.
    pub cycles: u64,
    /// Instructions committed.
    pub committed: u64,
    /// Committed instructions per class.
    pub inst_mix: BTreeMap<OpClass, u64>,

    /// Loads sent to a functional unit.
    pub loads_issued: u64,
    /// Loads satisfied by store-to-load forwarding.
    pub loads_forwarded: u64,
    /// Loads satisfied by a stream prefetch.
    pub loads_from_stream: u64,
    /// Loads sent to the memory system.
    pub loads_to_memory: u64,
    /// Stores committed and drained to memory.
    pub stores_committed: u64,
    /// Store writes acknowledged by memory.
    pub stores_completed: u64,

    /// Committed instructions carrying a branch outcome.
    pub branches: u64,
    /// Committed branches that were mispredicted.
    pub branch_mispredictions: u64,

    /// Stall counters.
    pub stalls: StallStats,
    /// Window occupancy over time.
    pub occupancy: WindowOccupancy,
    /// Stream engine counters.
    pub stream: StreamStats,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"window"`, `"stalls"`, `"instruction_mix"`,
/// `"stream"`. Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "window", "stalls", "instruction_mix", "stream"];

impl SimStats {
    /// Instructions committed per cycle.
    pub fn ipc(&self) -> f64 {
        self.committed as f64 / self.cycles.max(1) as f64
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]. Pass an
    /// empty slice to print all sections.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cyc = self.cycles.max(1);
        let pct = |n: u64| (n as f64 / cyc as f64) * 100.0;

        if want("summary") {
            let cpi = cyc as f64 / self.committed.max(1) as f64;
            println!("\n==========================================================");
            println!("TRACE TIMING SIMULATION STATISTICS");
            println!("==========================================================");
            println!("sim_cycles               {}", self.cycles);
            println!("sim_insts                {}", self.committed);
            println!("sim_ipc                  {:.4}", self.ipc());
            println!("sim_cpi                  {cpi:.4}");
            println!("loads.issued             {}", self.loads_issued);
            println!("loads.forwarded          {}", self.loads_forwarded);
            println!("loads.from_stream        {}", self.loads_from_stream);
            println!("loads.to_memory          {}", self.loads_to_memory);
            println!("stores.committed         {}", self.stores_committed);
            println!("stores.completed         {}", self.stores_completed);
            println!(
                "branches                 {} ({} mispredicted)",
                self.branches, self.branch_mispredictions
            );
            println!("----------------------------------------------------------");
        }
        if want("window") {
            println!("WINDOW OCCUPANCY          avg      peak  capacity");
            let rows = [
                ("fetch_queue", &self.occupancy.fetch_queue),
                ("decode_queue", &self.occupancy.decode_queue),
                ("rob", &self.occupancy.rob),
                ("iq", &self.occupancy.iq),
                ("sq", &self.occupancy.sq),
            ];
            for (name, occ) in rows {
                println!(
                    "  {:<18} {:>8.2} {:>8} {:>8}",
                    name,
                    occ.average(),
                    occ.peak,
                    occ.capacity
                );
            }
            println!("----------------------------------------------------------");
        }
        if want("stalls") {
            let s = &self.stalls;
            println!("STALLS");
            let rows = [
                ("fetch_queue_full", s.fetch_queue_full),
                ("fetch_redirect", s.fetch_redirect),
                ("decode_queue_full", s.decode_queue_full),
                ("rob_full", s.rob_full),
                ("iq_full", s.iq_full),
                ("sq_full", s.sq_full),
                ("fu_busy", s.fu_busy),
                ("memory_order", s.memory_order),
            ];
            for (name, n) in rows {
                println!("  {:<22} {} ({:.2}%)", name, n, pct(n));
            }
            println!("----------------------------------------------------------");
        }
        if want("instruction_mix") {
            println!("INSTRUCTION MIX");
            let total = self.committed.max(1) as f64;
            for (class, n) in &self.inst_mix {
                println!(
                    "  {:<22} {} ({:.2}%)",
                    format!("{class:?}"),
                    n,
                    *n as f64 / total * 100.0
                );
            }
            println!("----------------------------------------------------------");
        }
        if want("stream") {
            let s = &self.stream;
            let demand = (s.hits + s.late + s.misses).max(1) as f64;
            println!("STREAM ENGINE");
            println!("  streams.configured     {}", s.configured);
            println!("  streams.dependent      {}", s.dependent_configured);
            println!("  streams.ended          {}", s.ended);
            println!("  streams.closed         {}", s.closed);
            println!("  elements.assigned      {}", s.elements_assigned);
            println!("  prefetch.issued        {}", s.prefetches_issued);
            println!(
                "  prefetch.hits          {} ({:.2}%)",
                s.hits,
                s.hits as f64 / demand * 100.0
            );
            println!(
                "  prefetch.late          {} ({:.2}%)",
                s.late,
                s.late as f64 / demand * 100.0
            );
            println!("  prefetch.misses        {}", s.misses);
            println!("  prefetch.wasted        {}", s.wasted);
            println!("  prefetch.mispredicted  {}", s.mispredictions);
            println!("  run_ahead.avg          {:.2}", s.average_run_ahead());
            println!("  run_ahead.peak         {}", s.peak_run_ahead);
            println!("  run_ahead.changes      {}", s.run_ahead_changes);
            println!("  outstanding.peak       {}", s.peak_outstanding);
            println!("  dependent.waits        {}", s.dependent_waits);
            println!("==========================================================");
        }
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
