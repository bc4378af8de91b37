//! Stream prefetch engine scenario tests.
//!
//! Verifies, end to end through the simulator:
//!   1. Oracle prefetch addresses match the demand addresses they serve
//!   2. Static throttling bounds outstanding prefetches at the run-ahead length
//!   3. Adaptive throttling grows run-ahead under late prefetches
//!   4. `Off` mode never prefetches
//!   5. Stream lifecycle errors in the trace are fatal
//!   6. A dependent stream never prefetches ahead of its base stream's data

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use tracesim_core::common::{MemKind, SimError, StreamId, TraceError};
use tracesim_core::config::{Config, StreamMode, Throttling};
use tracesim_core::trace::StreamDecl;

use crate::common::builder::trace::TraceBuilder;
use crate::common::harness::{TestContext, run_trace};
use crate::common::mocks::memory::RecordingMemory;

const BASE: u64 = 0x10_0000;

fn stream_config(mode: StreamMode, run_ahead: usize) -> Config {
    let mut config = Config::default();
    config.stream.mode = mode;
    config.stream.run_ahead_length = run_ahead;
    config
}

#[test]
fn oracle_prefetches_exactly_the_demand_addresses() {
    let trace = TraceBuilder::new().strided_loop(1, BASE, 64, 32).build();
    let demand: BTreeSet<u64> = (0..32).map(|i| BASE + i * 64).collect();

    let (memory, log) = RecordingMemory::new(30);
    let mut tc = TestContext::with_memory(stream_config(StreamMode::Oracle, 8), trace, memory);
    let stats = tc.run().unwrap();

    let prefetched: Vec<u64> = log
        .borrow()
        .iter()
        .filter(|(_, r)| r.kind == MemKind::Prefetch)
        .map(|(_, r)| r.addr)
        .collect();
    assert!(!prefetched.is_empty());
    assert!(prefetched.iter().all(|a| demand.contains(a)));
    assert!(prefetched.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(stats.stream.mispredictions, 0);
    assert_eq!(stats.stream.wasted, 0);
    assert_eq!(
        stats.stream.hits + stats.stream.late + stats.stream.misses,
        32
    );
    assert_eq!(stats.stream.configured, 1);
    assert_eq!(stats.stream.closed, 1);
}

#[test]
fn oracle_follows_recorded_history() {
    let history = vec![0x500, 0x100, 0x900, 0x300];
    let mut b = TraceBuilder::new().configure_decl(StreamDecl {
        id: StreamId(2),
        base: 0,
        stride: 0,
        elem_size: 8,
        length: Some(4),
        history: history.clone(),
        base_stream: None,
    });
    for &addr in &history {
        b = b.stream_load(2, addr);
    }
    let trace = b.end(2).build();

    let (memory, log) = RecordingMemory::new(30);
    let mut tc = TestContext::with_memory(stream_config(StreamMode::Oracle, 4), trace, memory);
    let stats = tc.run().unwrap();
    let prefetched: Vec<u64> = log
        .borrow()
        .iter()
        .filter(|(_, r)| r.kind == MemKind::Prefetch)
        .map(|(_, r)| r.addr)
        .collect();
    assert_eq!(prefetched, history);
    assert_eq!(stats.loads_to_memory, 0);
    assert_eq!(stats.stream.mispredictions, 0);
}

#[test]
fn static_throttle_caps_outstanding_prefetches() {
    let trace = TraceBuilder::new().strided_loop(1, BASE, 8, 200).build();
    let mut config = stream_config(StreamMode::Throttled, 4);
    config.stream.throttling = Throttling::Static;
    config.memory.latency = 20;

    let mut tc = TestContext::new(config, trace);
    let stats = tc.run().unwrap();
    let peak = tc
        .reports
        .iter()
        .map(|r| r.occupancy.prefetches)
        .max()
        .unwrap_or(0);
    assert_eq!(peak, 4);
    assert_eq!(stats.stream.peak_outstanding, 4);
    assert_eq!(stats.stream.wasted, 0);
    assert_eq!(stats.stream.mispredictions, 0);
    assert_eq!(stats.stream.peak_run_ahead, 4);
    assert!(stats.stream.used() > 150);
}

#[test]
fn adaptive_throttle_grows_under_late_prefetches() {
    let trace = TraceBuilder::new().strided_loop(1, BASE, 8, 200).build();
    let mut config = stream_config(StreamMode::Throttled, 10);
    config.stream.throttling = Throttling::Adaptive;
    config.memory.latency = 100;

    let stats = run_trace(config, trace);
    assert!(stats.stream.late >= 10, "late = {}", stats.stream.late);
    assert!(stats.stream.run_ahead_changes > 0);
    assert!(stats.stream.peak_run_ahead > 2);
    assert!(stats.stream.peak_run_ahead <= 10);
}

#[test]
fn off_mode_sends_every_load_to_memory() {
    let trace = TraceBuilder::new().strided_loop(1, BASE, 8, 50).build();
    let stats = run_trace(stream_config(StreamMode::Off, 10), trace);
    assert_eq!(stats.stream.prefetches_issued, 0);
    assert_eq!(stats.loads_to_memory, 50);
    assert_eq!(stats.loads_from_stream, 0);
    assert_eq!(stats.stream.closed, 1);
}

#[test]
fn prefetching_beats_no_prefetching() {
    let trace = TraceBuilder::new().strided_loop(1, BASE, 64, 100).build();
    let mut off = stream_config(StreamMode::Off, 10);
    off.window.rob_size = 8;
    let mut oracle = stream_config(StreamMode::Oracle, 10);
    oracle.window.rob_size = 8;
    let baseline = run_trace(off, trace.clone());
    let prefetched = run_trace(oracle, trace);
    assert!(prefetched.cycles < baseline.cycles);
}

#[test]
fn stream_left_open_closes_at_end_of_trace() {
    let trace = TraceBuilder::new()
        .configure(3, BASE, 8, None)
        .stream_load(3, BASE)
        .stream_load(3, BASE + 8)
        .build();
    let stats = run_trace(stream_config(StreamMode::Oracle, 6), trace);
    assert_eq!(stats.stream.ended, 1);
    assert_eq!(stats.stream.closed, 1);
    assert_eq!(stats.committed, 3);
}

#[test]
fn access_to_unconfigured_stream_is_fatal() {
    let trace = TraceBuilder::new().alu().stream_load(9, BASE).build();
    let err = TestContext::new(Config::default(), trace).run().unwrap_err();
    assert_eq!(
        err,
        SimError::Trace(TraceError::UnknownStream {
            id: tracesim_core::common::InstId(1),
            stream: StreamId(9),
        })
    );
}

#[test]
fn reconfiguring_active_stream_is_fatal() {
    let trace = TraceBuilder::new()
        .configure(1, BASE, 8, None)
        .configure(1, BASE, 8, None)
        .build();
    let err = TestContext::new(Config::default(), trace).run().unwrap_err();
    assert!(matches!(
        err,
        SimError::Trace(TraceError::DuplicateStream { .. })
    ));
}

#[test]
fn dependent_prefetch_never_precedes_base_arrival() {
    const LATENCY: u64 = 30;
    const N: u64 = 24;
    const TABLE: u64 = 0x80_0000;
    let history: Vec<u64> = (0..N).map(|i| TABLE + (i * 7919 % 64) * 64).collect();

    let mut b = TraceBuilder::new()
        .configure(1, BASE, 8, Some(N))
        .configure_decl(StreamDecl {
            id: StreamId(2),
            base: 0,
            stride: 0,
            elem_size: 8,
            length: Some(N),
            history: history.clone(),
            base_stream: Some(StreamId(1)),
        });
    for (i, &addr) in history.iter().enumerate() {
        let index_load = b.peek_id().0;
        b = b
            .stream_load(1, BASE + i as u64 * 8)
            .stream_load(2, addr)
            .deps(&[index_load]);
    }
    let trace = b.end(2).end(1).build();

    let (memory, log) = RecordingMemory::new(LATENCY);
    let mut tc = TestContext::with_memory(stream_config(StreamMode::Oracle, 4), trace, memory);
    let stats = tc.run().unwrap();

    let log = log.borrow();
    let first_request = |addr: u64| {
        log.iter()
            .filter(|(_, r)| r.addr == addr)
            .map(|&(at, _)| at)
            .min()
    };
    let mut checked = 0;
    for &(at, request) in log.iter() {
        if request.kind != MemKind::Prefetch || request.addr < TABLE {
            continue;
        }
        let index = history.iter().position(|&a| a == request.addr).unwrap() as u64;
        let base_issued = first_request(BASE + index * 8).unwrap();
        assert!(
            at >= base_issued + LATENCY,
            "element {index} prefetched at {at}, base data arrives at {}",
            base_issued + LATENCY
        );
        checked += 1;
    }
    assert!(checked > 0);
    assert!(stats.stream.dependent_waits > 0);
    assert_eq!(stats.stream.dependent_configured, 1);
    assert_eq!(stats.stream.mispredictions, 0);
    assert_eq!(stats.stream.closed, 2);
}

#[test]
fn dependent_on_unconfigured_base_is_fatal() {
    let trace = TraceBuilder::new()
        .configure_decl(StreamDecl {
            id: StreamId(2),
            base: BASE,
            stride: 8,
            elem_size: 8,
            length: None,
            history: Vec::new(),
            base_stream: Some(StreamId(1)),
        })
        .build();
    let err = TestContext::new(Config::default(), trace).run().unwrap_err();
    assert_eq!(
        err,
        SimError::Trace(TraceError::UnknownBaseStream {
            id: tracesim_core::common::InstId(0),
            stream: StreamId(2),
            base: StreamId(1),
        })
    );
}
