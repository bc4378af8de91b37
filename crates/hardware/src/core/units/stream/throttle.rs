//! Run-ahead throttling policies.
//!
//! A policy owns nothing but the current run-ahead distance of one stream and
//! the counters it needs to adjust it. The stream engine reports two events:
//! a *late* fetch (the demand access found its element still in flight) and
//! *waste* (a prefetched element was thrown away). Policies are a closed set
//! selected from configuration.

use crate::config::{StreamConfig, StreamMode, Throttling};

/// Run-ahead policy of one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Throttle {
    /// Fixed run-ahead; addresses are known exactly.
    Oracle {
        /// Current distance.
        run_ahead: usize,
    },
    /// Fixed run-ahead on predicted addresses.
    Static {
        /// Current distance.
        run_ahead: usize,
    },
    /// Run-ahead that grows on late fetches and shrinks on waste.
    Adaptive {
        /// Current distance.
        run_ahead: usize,
        /// Upper bound.
        max: usize,
        /// Late fetches seen since the last increase.
        late_count: u32,
        /// Late fetches that trigger an increase.
        late_threshold: u32,
        /// Distance added per increase.
        increment: usize,
    },
}

impl Throttle {
    /// Builds the policy selected by `config`.
    pub fn from_config(config: &StreamConfig) -> Self {
        match (config.mode, config.throttling) {
            (StreamMode::Oracle, _) => Self::Oracle {
                run_ahead: config.run_ahead_length,
            },
            (StreamMode::Off, _) => Self::Static { run_ahead: 0 },
            (StreamMode::Throttled, Throttling::Static) => Self::Static {
                run_ahead: config.run_ahead_length,
            },
            (StreamMode::Throttled, Throttling::Adaptive) => Self::Adaptive {
                run_ahead: config.initial_run_ahead.min(config.run_ahead_length),
                max: config.run_ahead_length,
                late_count: 0,
                late_threshold: config.late_threshold,
                increment: config.run_ahead_increment,
            },
        }
    }

    /// Current run-ahead distance.
    pub const fn run_ahead(&self) -> usize {
        match *self {
            Self::Oracle { run_ahead }
            | Self::Static { run_ahead }
            | Self::Adaptive { run_ahead, .. } => run_ahead,
        }
    }

    /// A demand access caught up with an in-flight prefetch.
    ///
    /// Returns the new distance if it changed.
    pub fn on_late(&mut self) -> Option<usize> {
        let Self::Adaptive {
            run_ahead,
            max,
            late_count,
            late_threshold,
            increment,
        } = self
        else {
            return None;
        };
        *late_count += 1;
        if *late_count < *late_threshold {
            return None;
        }
        *late_count = 0;
        let grown = (*run_ahead + *increment).min(*max);
        if grown == *run_ahead {
            return None;
        }
        *run_ahead = grown;
        Some(grown)
    }

    /// Prefetched elements were discarded.
    ///
    /// Returns the new distance if it changed.
    pub fn on_waste(&mut self) -> Option<usize> {
        let Self::Adaptive {
            run_ahead,
            late_count,
            ..
        } = self
        else {
            return None;
        };
        *late_count = 0;
        if *run_ahead <= 1 {
            return None;
        }
        *run_ahead -= 1;
        Some(*run_ahead)
    }
}
