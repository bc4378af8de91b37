//! SimStats tests.
//!
//! Verifies the counters a finished run reports and the derived metrics.

use pretty_assertions::assert_eq;
use tracesim_core::common::OpClass;
use tracesim_core::config::{Config, StreamMode};
use tracesim_core::stats::{OccupancyStats, STATS_SECTIONS, SimStats};

use crate::common::builder::trace::TraceBuilder;
use crate::common::harness::run_trace;

#[test]
fn default_stats_all_zero() {
    let stats = SimStats::default();
    assert_eq!(stats.cycles, 0);
    assert_eq!(stats.committed, 0);
    assert!(stats.inst_mix.is_empty());
    assert_eq!(stats.ipc(), 0.0);
    assert_eq!(stats.stream.used(), 0);
}

#[test]
fn instruction_mix_sums_to_committed() {
    let trace = TraceBuilder::new()
        .alus(3)
        .op(OpClass::IntMult)
        .op(OpClass::FloatDiv)
        .load(0x40)
        .store(0x80)
        .op(OpClass::Nop)
        .build();
    let stats = run_trace(Config::default(), trace);
    assert_eq!(stats.committed, 8);
    assert_eq!(stats.inst_mix.values().sum::<u64>(), 8);
    assert_eq!(stats.inst_mix.get(&OpClass::IntAlu), Some(&3));
    assert_eq!(stats.inst_mix.get(&OpClass::MemWrite), Some(&1));
    assert_eq!(stats.loads_issued, 1);
    assert_eq!(stats.stores_committed, 1);
}

#[test]
fn occupancy_samples_once_per_cycle() {
    let stats = run_trace(Config::default(), TraceBuilder::new().alus(30).build());
    assert_eq!(stats.occupancy.rob.samples, stats.cycles);
    assert_eq!(stats.occupancy.rob.capacity, 32);
    assert!(stats.occupancy.rob.average() > 0.0);
    assert!(stats.occupancy.rob.average() <= stats.occupancy.rob.peak as f64);
}

#[test]
fn occupancy_average_and_peak() {
    let mut occ = OccupancyStats::new(8);
    for n in [2, 6, 4] {
        occ.sample(n);
    }
    assert_eq!(occ.peak, 6);
    assert_eq!(occ.total, 12);
    assert_eq!(occ.average(), 4.0);
}

#[test]
fn stream_counters_balance() {
    let trace = TraceBuilder::new().strided_loop(1, 0x4000, 8, 64).build();
    let mut config = Config::default();
    config.stream.mode = StreamMode::Oracle;
    let stats = run_trace(config, trace);
    let s = &stats.stream;
    assert_eq!(s.elements_assigned, 64);
    assert_eq!(s.hits + s.late + s.misses, 64);
    assert_eq!(s.used() + s.wasted, s.prefetches_issued);
    assert_eq!(stats.loads_from_stream, s.used());
}

#[test]
fn stats_serialize_to_json() {
    let stats = run_trace(Config::default(), TraceBuilder::new().alus(5).load(0x10).build());
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["committed"], 6);
    assert!(json["stream"].is_object());
    assert!(json["occupancy"]["rob"]["peak"].is_number());
}

#[test]
fn every_section_prints() {
    let stats = run_trace(Config::default(), TraceBuilder::new().alus(5).build());
    let all: Vec<String> = STATS_SECTIONS.iter().map(ToString::to_string).collect();
    stats.print_sections(&all);
    stats.print_sections(&[]);
}
