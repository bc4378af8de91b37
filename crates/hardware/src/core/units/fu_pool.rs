//! Functional unit pool.
//!
//! A fixed inventory of execution units grouped by operation class. A unit is
//! held exclusively from allocation until it is released, and never becomes
//! free again before its latency has elapsed.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::common::{Cycle, OpClass};
use crate::config::FuPoolConfig;

/// Allocation of one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuHandle {
    /// Class of the unit.
    pub class: OpClass,
    /// Index of the unit within its class.
    pub unit: usize,
    /// Cycle at which the operation finishes and the unit may be released.
    pub ready_at: Cycle,
}

/// Every unit of the requested class is occupied this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no free {class:?} unit")]
pub struct FuBusy {
    /// Requested class.
    pub class: OpClass,
}

#[derive(Clone, Copy, Debug, Default)]
struct Unit {
    held: bool,
    free_at: Cycle,
}

#[derive(Clone, Debug)]
struct UnitClass {
    latency: Cycle,
    units: Vec<Unit>,
}

/// Pool of functional units keyed by operation class.
#[derive(Clone, Debug)]
pub struct FuPool {
    classes: BTreeMap<OpClass, UnitClass>,
}

impl FuPool {
    /// Builds the pool described by `config`.
    pub fn new(config: &FuPoolConfig) -> Self {
        let classes = config
            .units
            .iter()
            .map(|fu| {
                (
                    fu.class,
                    UnitClass {
                        latency: fu.latency,
                        units: vec![Unit::default(); fu.count],
                    },
                )
            })
            .collect();
        Self { classes }
    }

    /// Returns true if at least one unit of `class` exists.
    pub fn has_class(&self, class: OpClass) -> bool {
        self.classes.contains_key(&class)
    }

    /// Claims a free unit of `class` for its configured latency, starting at `now`.
    ///
    /// Fails without side effects if every unit is held or the class has no
    /// units; callers check [`FuPool::has_class`] first.
    pub fn allocate(&mut self, class: OpClass, now: Cycle) -> Result<FuHandle, FuBusy> {
        let (latency, units) = self
            .classes
            .get_mut(&class)
            .map(|c| (c.latency, &mut c.units))
            .ok_or(FuBusy { class })?;
        let (index, unit) = units
            .iter_mut()
            .enumerate()
            .find(|(_, u)| !u.held && u.free_at <= now)
            .ok_or(FuBusy { class })?;
        let ready_at = now + latency.max(1);
        unit.held = true;
        unit.free_at = ready_at;
        Ok(FuHandle {
            class,
            unit: index,
            ready_at,
        })
    }

    /// Returns a unit to the pool.
    pub fn release(&mut self, handle: FuHandle) {
        if let Some(unit) = self
            .classes
            .get_mut(&handle.class)
            .and_then(|c| c.units.get_mut(handle.unit))
        {
            unit.held = false;
        }
    }

    /// Number of units of `class` held at the moment.
    pub fn busy(&self, class: OpClass) -> usize {
        self.classes
            .get(&class)
            .map_or(0, |c| c.units.iter().filter(|u| u.held).count())
    }
}
