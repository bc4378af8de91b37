//! Simulator: owns the core, the trace, and the memory system side by side.
//!
//! Every cycle runs in a fixed order:
//! 1. **Memory:** Completions due this cycle are routed to their owners.
//! 2. **Pipeline:** Commit, IEW, Rename, Decode, Fetch, against the free-slot
//!    budget snapshotted at the start of the cycle.
//! 3. **Stream engine:** Issues prefetches for live streams.
//! 4. **Bookkeeping:** Occupancy sampling, end-of-run check, watchdog.

use std::fmt;

use tracing::{debug, error, info, trace};

use crate::common::{Cycle, InstId, SimError};
use crate::config::Config;
use crate::core::pipeline::stages::{
    commit_stage, decode_stage, fetch_stage, iew_stage, rename_stage,
};
use crate::core::{Core, Occupancy, Outstanding, Owner};
use crate::memory::{self, Completion, MemoryInterface, RequestId};
use crate::sim::watchdog::{Verdict, Watchdog};
use crate::stats::SimStats;
use crate::trace::{TraceReader, TraceSource};

/// What happened in one call to [`Simulator::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// The cycle that was simulated.
    pub cycle: Cycle,
    /// Instructions retired this cycle, oldest first.
    pub committed: Vec<InstId>,
    /// Occupancy at the end of the cycle.
    pub occupancy: Occupancy,
    /// The run is complete; further steps do nothing.
    pub finished: bool,
}

/// Top-level simulator: core state, trace front end, and memory system.
pub struct Simulator {
    core: Core,
    trace: TraceReader,
    memory: Box<dyn MemoryInterface>,
    watchdog: Watchdog,
    cycle: Cycle,
    finished: bool,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("cycle", &self.cycle)
            .field("finished", &self.finished)
            .field("trace", &self.trace)
            .field("watchdog", &self.watchdog)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Creates a simulator over `trace` and `memory`.
    ///
    /// The configuration is validated here; nothing is simulated yet.
    pub fn new(
        config: Config,
        trace: impl TraceSource + 'static,
        memory: impl MemoryInterface + 'static,
    ) -> Result<Self, SimError> {
        config.validate()?;
        debug!(
            rob = config.window.rob_size,
            iq = config.window.iq_size,
            mode = ?config.stream.mode,
            "simulator configured"
        );
        Ok(Self {
            watchdog: Watchdog::new(&config.watchdog),
            core: Core::new(config),
            trace: TraceReader::new(Box::new(trace)),
            memory: Box::new(memory),
            cycle: 0,
            finished: false,
        })
    }

    /// Creates a simulator backed by the memory model named in `config.memory`.
    pub fn with_timed_memory(
        config: Config,
        trace: impl TraceSource + 'static,
    ) -> Result<Self, SimError> {
        let memory = memory::from_config(&config.memory);
        Self::new(config, trace, memory)
    }

    /// Simulates one cycle.
    ///
    /// Once the run has finished this returns a report with `finished` set and
    /// leaves all state untouched.
    pub fn step(&mut self) -> Result<CycleReport, SimError> {
        if self.finished {
            return Ok(CycleReport {
                cycle: self.cycle,
                committed: Vec::new(),
                occupancy: self.core.occupancy(),
                finished: true,
            });
        }
        let now = self.cycle;
        let before = self.core.progress;

        for completion in self.memory.drain_completions(now) {
            self.on_complete(completion)?;
        }

        let mut budget = self.core.budget();
        let committed = commit_stage(&mut self.core, self.memory.as_mut(), now);
        iew_stage(&mut self.core, self.memory.as_mut(), now)?;
        let trace_exhausted = self.trace.is_exhausted() && self.core.fetch_queue.is_empty();
        rename_stage(&mut self.core, &mut budget, trace_exhausted, now)?;
        decode_stage(&mut self.core, &mut budget, now);
        fetch_stage(&mut self.core, &mut self.trace, &mut budget, now)?;
        self.tick_streams(now);

        self.core.sample_occupancy();
        self.cycle += 1;
        self.core.stats.cycles = self.cycle;

        self.finished = self.trace.is_exhausted()
            && self.core.is_drained()
            && self.core.streams.is_quiescent()
            && self.core.outstanding.is_empty();
        if self.finished {
            info!(
                cycles = self.cycle,
                committed = self.core.stats.committed,
                "trace completed"
            );
        } else {
            self.check_watchdog(self.core.progress != before, now)?;
        }

        Ok(CycleReport {
            cycle: now,
            committed,
            occupancy: self.core.occupancy(),
            finished: self.finished,
        })
    }

    /// Steps until the trace has fully drained and returns the final statistics.
    pub fn run(&mut self) -> Result<SimStats, SimError> {
        while !self.step()?.finished {}
        Ok(self.stats())
    }

    /// Routes a memory completion to whoever issued the request.
    ///
    /// Loads complete, store completions are counted, and prefetches mark their
    /// element ready and wake any loads already waiting on it.
    pub fn on_complete(&mut self, completion: Completion) -> Result<(), SimError> {
        let Completion { request, at } = completion;
        let Some(Outstanding { owner, issued }) = self.core.outstanding.remove(&request) else {
            error!(%request, at, "completion for unknown request");
            return Err(SimError::UnknownRequest(request));
        };
        if at < issued {
            error!(%request, issued, at, "completion precedes issue");
            return Err(SimError::EarlyCompletion {
                request,
                issued,
                completed: at,
            });
        }
        let now = self.cycle;
        self.core.progress += 1;
        trace!(%request, ?owner, at, now, "memory completion");

        match owner {
            Owner::Load(id) => self.core.complete(id, now),
            Owner::Store(_) => self.core.stats.stores_completed += 1,
            Owner::Prefetch => {
                if !self.core.streams.on_complete(request) {
                    error!(%request, at, "prefetch completion unknown to the stream engine");
                    return Err(SimError::UnknownRequest(request));
                }
                let waiters = self.core.prefetch_waiters.remove(&request).unwrap_or_default();
                for id in waiters {
                    self.core.complete(id, now);
                }
            }
        }
        Ok(())
    }

    /// Current occupancy of every structure.
    pub fn occupancy(&self) -> Occupancy {
        self.core.occupancy()
    }

    /// Statistics collected so far.
    pub fn stats(&self) -> SimStats {
        self.core.snapshot_stats()
    }

    /// Number of cycles simulated so far.
    pub const fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Returns true once the run has completed.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read-only view of the core.
    pub const fn core(&self) -> &Core {
        &self.core
    }

    fn tick_streams(&mut self, now: Cycle) {
        let memory = self.memory.as_mut();
        let mut issued: Vec<RequestId> = Vec::new();
        self.core.streams.tick(now, &mut |request| {
            let id = memory.issue_request(request, now);
            issued.push(id);
            id
        });
        for id in issued {
            let _ = self.core.outstanding.insert(
                id,
                Outstanding {
                    owner: Owner::Prefetch,
                    issued: now,
                },
            );
        }
    }

    fn check_watchdog(&mut self, progressed: bool, now: Cycle) -> Result<(), SimError> {
        match self.watchdog.observe(progressed, now) {
            Verdict::Ok => Ok(()),
            Verdict::Stalled { idle_cycles } => {
                let err = match self.core.oldest() {
                    Some((inst, stage)) => SimError::Deadlock {
                        inst,
                        stage,
                        cycle: now,
                        idle_cycles,
                    },
                    None => SimError::Hang {
                        cycle: now,
                        idle_cycles,
                        pending_requests: self.core.outstanding.len(),
                        live_streams: self.core.streams.live(),
                    },
                };
                error!(%err, "watchdog fired");
                Err(err)
            }
            Verdict::CycleLimit { limit } => {
                error!(limit, "cycle limit reached");
                Err(SimError::CycleLimit { limit })
            }
        }
    }
}
