//! Pipeline scenario tests.
//!
//! Covers:
//!   1. Program-order commit for arbitrary dependency graphs
//!   2. Capacity bounds of every window structure in every cycle
//!   3. Exact timing of a window-limited core and fetch width sensitivity
//!   4. Store-to-load forwarding bypasses the memory system
//!   5. Fetch redirect behind a mispredicted branch

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tracesim_core::common::{Cycle, InstId, MemKind, OpClass};
use tracesim_core::config::{Config, FuPoolConfig};
use tracesim_core::memory::{Completion, RequestId};
use tracesim_core::trace::{InstructionRecord, MemAccess};

use crate::common::builder::trace::TraceBuilder;
use crate::common::harness::{TestContext, run_trace};
use crate::common::mocks::memory::MockMemory;

// ══════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════

const CLASSES: [OpClass; 7] = [
    OpClass::Nop,
    OpClass::IntAlu,
    OpClass::IntMult,
    OpClass::IntDiv,
    OpClass::FloatAdd,
    OpClass::MemRead,
    OpClass::MemWrite,
];

/// One generated record: class index, dependency back-distances, address slot.
type RawRecord = (usize, Vec<u64>, u64);

fn raw_trace(max_len: usize) -> impl Strategy<Value = Vec<RawRecord>> {
    prop::collection::vec(
        (
            0..CLASSES.len(),
            prop::collection::vec(1..6u64, 0..3),
            0..4u64,
        ),
        1..max_len,
    )
}

fn materialize(raw: &[RawRecord]) -> Vec<InstructionRecord> {
    raw.iter()
        .enumerate()
        .map(|(i, (class, back, slot))| {
            let id = i as u64;
            let op = CLASSES[*class];
            let mut rec = InstructionRecord::new(InstId(id), op);
            rec.deps = back
                .iter()
                .filter(|&&d| d <= id)
                .map(|d| InstId(id - d))
                .collect();
            rec.deps.sort_unstable();
            rec.deps.dedup();
            if op.is_mem() {
                rec.mem = Some(MemAccess {
                    addr: 0x1000 + slot * 8,
                    size: 8,
                    stream: None,
                });
            }
            rec
        })
        .collect()
}

fn fast_memory() -> Config {
    let mut config = Config::default();
    config.memory.latency = 7;
    config
}

// ══════════════════════════════════════════════════════════
// 1. Program order
// ══════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn commit_order_matches_trace_order(raw in raw_trace(80)) {
        let records = materialize(&raw);
        let n = records.len() as u64;
        let mut tc = TestContext::new(fast_memory(), records);
        let stats = tc.run().unwrap();
        prop_assert_eq!(stats.committed, n);
        prop_assert_eq!(tc.commit_order(), (0..n).collect::<Vec<_>>());
    }

    // ══════════════════════════════════════════════════════
    // 2. Capacity
    // ══════════════════════════════════════════════════════

    #[test]
    fn structures_never_exceed_capacity(
        raw in raw_trace(60),
        fq in 1..5usize,
        dq in 1..5usize,
        rob in 1..9usize,
        iq in 1..9usize,
        sq in 1..4usize,
        width in 1..5usize,
    ) {
        let mut config = fast_memory();
        config.window.fetch_queue_size = fq;
        config.window.decode_queue_size = dq;
        config.window.rob_size = rob;
        config.window.iq_size = iq;
        config.window.sq_size = sq;
        config.pipeline.fetch_width = width;
        config.pipeline.rename_width = width;

        let mut tc = TestContext::new(config, materialize(&raw));
        let _ = tc.run().unwrap();
        for report in &tc.reports {
            let occ = report.occupancy;
            prop_assert!(occ.fetch_queue <= fq, "cycle {}: fetch queue {}", report.cycle, occ.fetch_queue);
            prop_assert!(occ.decode_queue <= dq, "cycle {}: decode queue {}", report.cycle, occ.decode_queue);
            prop_assert!(occ.rob <= rob, "cycle {}: rob {}", report.cycle, occ.rob);
            prop_assert!(occ.iq <= iq, "cycle {}: iq {}", report.cycle, occ.iq);
            prop_assert!(occ.sq <= sq, "cycle {}: sq {}", report.cycle, occ.sq);
            prop_assert!(report.committed.len() <= 8);
        }
        let peak = tc.sim.stats().occupancy;
        prop_assert!(peak.rob.peak <= rob);
        prop_assert!(peak.iq.peak <= iq);
    }
}

// ══════════════════════════════════════════════════════════
// 3. Fetch width
// ══════════════════════════════════════════════════════════

fn window_limited(fetch_width: usize) -> Config {
    let mut config = Config::default();
    config.window.rob_size = 4;
    config.fu_pool = FuPoolConfig::single(OpClass::IntAlu, 1, 1);
    config.pipeline.fetch_width = fetch_width;
    config
}

#[test]
fn window_limited_run_has_exact_timing() {
    let stats = run_trace(window_limited(2), TraceBuilder::new().alus(10).build());
    assert_eq!(stats.committed, 10);
    assert_eq!(stats.cycles, 18);
    assert_eq!(stats.stalls.rob_full, 9);
    assert_eq!(stats.stalls.fu_busy, 3);
    assert_eq!(stats.stalls.fetch_queue_full, 0);
    assert_eq!(stats.stalls.fetch_redirect, 0);
    assert_eq!(stats.occupancy.rob.peak, 4);
}

#[test]
fn narrower_fetch_never_finishes_sooner() {
    let trace = TraceBuilder::new().alus(10).build();
    let mut previous: Option<Cycle> = None;
    for fetch_width in [8, 4, 2, 1] {
        let stats = run_trace(window_limited(fetch_width), trace.clone());
        assert_eq!(stats.committed, 10);
        if let Some(prev) = previous {
            assert!(
                stats.cycles >= prev,
                "fetch width {fetch_width}: {} cycles < {prev}",
                stats.cycles
            );
        }
        previous = Some(stats.cycles);
    }
}

#[test]
fn wide_fetch_finishes_sooner_when_fetch_bound() {
    let trace = TraceBuilder::new().alus(40).build();
    let run = |fetch_width| {
        let mut config = Config::default();
        config.pipeline.fetch_width = fetch_width;
        run_trace(config, trace.clone())
    };
    let narrow = run(1);
    let wide = run(8);
    assert_eq!(narrow.cycles, 46);
    assert_eq!(wide.cycles, 13);
    assert!(wide.cycles < narrow.cycles);
    assert_eq!(narrow.stalls.rob_full, 0);
    assert_eq!(wide.stalls.rob_full, 2);
}

#[test]
fn single_unit_serializes_independent_work() {
    let trace = TraceBuilder::new().alus(10).build();
    let mut config = Config::default();
    config.fu_pool = FuPoolConfig::single(OpClass::IntAlu, 1, 1);
    let narrow = run_trace(config, trace.clone());
    let wide = run_trace(Config::default(), trace);
    assert!(narrow.cycles > wide.cycles);
    assert!(narrow.stalls.fu_busy > wide.stalls.fu_busy);
}

#[test]
fn small_rob_reports_rob_full_stalls() {
    let trace = TraceBuilder::new().alus(40).build();
    let mut config = Config::default();
    config.window.rob_size = 2;
    let stats = run_trace(config, trace);
    assert_eq!(stats.committed, 40);
    assert!(stats.stalls.rob_full > 0);
    assert_eq!(stats.occupancy.rob.peak, 2);
}

// ══════════════════════════════════════════════════════════
// 4. Store-to-load forwarding
// ══════════════════════════════════════════════════════════

#[test]
fn forwarded_load_never_reaches_memory() {
    let write_issued: Arc<Mutex<Option<Cycle>>> = Arc::default();
    let mut memory = MockMemory::new();
    let _ = memory
        .expect_issue_request()
        .withf(|request, _| request.kind == MemKind::Read)
        .never();
    let issued = Arc::clone(&write_issued);
    let _ = memory
        .expect_issue_request()
        .withf(|request, _| request.kind == MemKind::Write && request.addr == 0x80)
        .times(1)
        .returning(move |_, now| {
            *issued.lock().unwrap() = Some(now);
            RequestId(7)
        });
    let pending = Arc::clone(&write_issued);
    let _ = memory.expect_drain_completions().returning(move |now| {
        pending
            .lock()
            .unwrap()
            .take()
            .map(|_| Completion {
                request: RequestId(7),
                at: now,
            })
            .into_iter()
            .collect()
    });

    let trace = TraceBuilder::new().store(0x80).load(0x80).build();
    let mut tc = TestContext::with_memory(Config::default(), trace, memory);
    let stats = tc.run().unwrap();
    assert_eq!(stats.loads_forwarded, 1);
    assert_eq!(stats.loads_to_memory, 0);
    assert_eq!(stats.stores_completed, 1);
    assert_eq!(tc.commit_order(), vec![0, 1]);
}

#[test]
fn disjoint_load_goes_to_memory() {
    let trace = TraceBuilder::new().store(0x80).load(0x100).build();
    let stats = run_trace(fast_memory(), trace);
    assert_eq!(stats.loads_forwarded, 0);
    assert_eq!(stats.loads_to_memory, 1);
}

// ══════════════════════════════════════════════════════════
// 5. Branch redirect
// ══════════════════════════════════════════════════════════

#[test]
fn mispredicted_branch_delays_younger_fetch() {
    let predicted = TraceBuilder::new().branch(false).alus(16).build();
    let mispredicted = TraceBuilder::new().branch(true).alus(16).build();
    let good = run_trace(Config::default(), predicted);
    let bad = run_trace(Config::default(), mispredicted);
    assert_eq!(good.branches, 1);
    assert_eq!(good.branch_mispredictions, 0);
    assert_eq!(bad.branch_mispredictions, 1);
    assert_eq!(good.stalls.fetch_redirect, 0);
    assert!(bad.stalls.fetch_redirect > 0);
    assert!(bad.cycles > good.cycles);
}
