use tracesim_core::common::SimError;
use tracesim_core::config::Config;
use tracesim_core::memory::MemoryInterface;
use tracesim_core::sim::CycleReport;
use tracesim_core::stats::SimStats;
use tracesim_core::{InstructionRecord, Simulator};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A simulator plus the report of every cycle it has run.
pub struct TestContext {
    pub sim: Simulator,
    pub reports: Vec<CycleReport>,
}

impl TestContext {
    /// Simulator over `records` with the bundled memory model.
    pub fn new(config: Config, records: Vec<InstructionRecord>) -> Self {
        init_tracing();
        let sim = Simulator::with_timed_memory(config, records.into_iter()).unwrap();
        Self {
            sim,
            reports: Vec::new(),
        }
    }

    /// Simulator over `records` with a caller-supplied memory system.
    pub fn with_memory(
        config: Config,
        records: Vec<InstructionRecord>,
        memory: impl MemoryInterface + 'static,
    ) -> Self {
        init_tracing();
        let sim = Simulator::new(config, records.into_iter(), memory).unwrap();
        Self {
            sim,
            reports: Vec::new(),
        }
    }

    /// Steps to completion, keeping every cycle report.
    pub fn run(&mut self) -> Result<SimStats, SimError> {
        loop {
            let report = self.sim.step()?;
            let finished = report.finished;
            self.reports.push(report);
            if finished {
                return Ok(self.sim.stats());
            }
        }
    }

    /// Ids in the order they committed.
    pub fn commit_order(&self) -> Vec<u64> {
        self.reports
            .iter()
            .flat_map(|r| r.committed.iter().map(|id| id.0))
            .collect()
    }
}

/// Runs `records` under `config` with the bundled memory and returns the stats.
pub fn run_trace(config: Config, records: Vec<InstructionRecord>) -> SimStats {
    TestContext::new(config, records).run().unwrap()
}
