//! Progress watchdog.
//!
//! Counts consecutive cycles in which no instruction moved, issued, completed,
//! or committed and no memory request finished. Crossing the configured limit
//! is fatal: the run is aborted rather than retried.

use crate::common::Cycle;
use crate::config::WatchdogConfig;

/// Watchdog verdict for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Keep running.
    Ok,
    /// No progress for `idle_cycles` consecutive cycles.
    Stalled {
        /// Consecutive idle cycles.
        idle_cycles: u64,
    },
    /// The hard cycle bound was reached.
    CycleLimit {
        /// Configured bound.
        limit: Cycle,
    },
}

/// Consecutive-idle-cycle counter with an optional hard cycle bound.
#[derive(Clone, Debug)]
pub struct Watchdog {
    stall_limit: u64,
    max_cycles: Option<Cycle>,
    idle: u64,
}

impl Watchdog {
    /// Creates a watchdog from its configuration.
    pub const fn new(config: &WatchdogConfig) -> Self {
        Self {
            stall_limit: config.stall_limit,
            max_cycles: config.max_cycles,
            idle: 0,
        }
    }

    /// Records the outcome of cycle `now`.
    pub fn observe(&mut self, progressed: bool, now: Cycle) -> Verdict {
        if progressed {
            self.idle = 0;
        } else {
            self.idle += 1;
            if self.idle >= self.stall_limit {
                return Verdict::Stalled {
                    idle_cycles: self.idle,
                };
            }
        }
        match self.max_cycles {
            Some(limit) if now + 1 >= limit => Verdict::CycleLimit { limit },
            _ => Verdict::Ok,
        }
    }

    /// Consecutive idle cycles so far.
    pub const fn idle_cycles(&self) -> u64 {
        self.idle
    }
}
