//! Configuration unit tests.
//!
//! Verifies JSON parsing with defaults and rejection of unusable values.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tracesim_core::common::{ConfigError, OpClass};
use tracesim_core::config::{Config, FuConfig, MemoryController, StreamMode, Throttling};

#[test]
fn empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn partial_json_overrides_only_named_fields() {
    let config = Config::from_json(
        r#"{
            "pipeline": { "fetch_width": 2 },
            "window": { "rob_size": 16 },
            "stream": { "mode": "Oracle", "run_ahead_length": 4 },
            "memory": { "controller": "DRAM" }
        }"#,
    )
    .unwrap();
    assert_eq!(config.pipeline.fetch_width, 2);
    assert_eq!(config.pipeline.commit_width, 8);
    assert_eq!(config.window.rob_size, 16);
    assert_eq!(config.window.iq_size, 64);
    assert_eq!(config.stream.mode, StreamMode::Oracle);
    assert_eq!(config.stream.run_ahead_length, 4);
    assert_eq!(config.memory.controller, MemoryController::Dram);
}

#[test]
fn unknown_throttling_policy_is_a_parse_error() {
    let err = Config::from_json(r#"{ "stream": { "throttling": "Psychic" } }"#).unwrap_err();
    let ConfigError::Parse(parse) = &err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(parse.json().is_data());
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.to_string().contains("Psychic"));
}

#[test]
fn zero_value_in_json_is_rejected() {
    let err = Config::from_json(r#"{ "window": { "sq_size": 0 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Zero { .. }));
}

#[rstest]
#[case::fetch_width(|c: &mut Config| c.pipeline.fetch_width = 0)]
#[case::commit_width(|c: &mut Config| c.pipeline.commit_width = 0)]
#[case::rob(|c: &mut Config| c.window.rob_size = 0)]
#[case::iq(|c: &mut Config| c.window.iq_size = 0)]
#[case::sq(|c: &mut Config| c.window.sq_size = 0)]
#[case::fetch_queue(|c: &mut Config| c.window.fetch_queue_size = 0)]
#[case::run_ahead(|c: &mut Config| c.stream.run_ahead_length = 0)]
#[case::prefetch_width(|c: &mut Config| c.stream.prefetch_width = 0)]
#[case::stall_limit(|c: &mut Config| c.watchdog.stall_limit = 0)]
fn zero_fields_are_rejected(#[case] mutate: fn(&mut Config)) {
    let mut config = Config::default();
    mutate(&mut config);
    assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
}

#[rstest]
#[case::nop(OpClass::Nop, 1, 1, ConfigError::NopUnit)]
#[case::zero_count(OpClass::IntAlu, 0, 1, ConfigError::Zero { field: "fu_pool.units.count" })]
#[case::zero_latency(OpClass::IntAlu, 1, 0, ConfigError::Zero { field: "fu_pool.units.latency" })]
fn bad_unit_entries_are_rejected(
    #[case] class: OpClass,
    #[case] count: usize,
    #[case] latency: u64,
    #[case] expected: ConfigError,
) {
    let mut config = Config::default();
    config.fu_pool.units = vec![FuConfig {
        class,
        count,
        latency,
    }];
    assert_eq!(config.validate(), Err(expected));
}

#[test]
fn duplicate_unit_class_is_rejected() {
    let mut config = Config::default();
    let alu = *config.fu_pool.get(OpClass::IntAlu).unwrap();
    config.fu_pool.units.push(alu);
    assert_eq!(
        config.validate(),
        Err(ConfigError::DuplicateUnit(OpClass::IntAlu))
    );
}

#[test]
fn adaptive_initial_above_ceiling_is_rejected() {
    let mut config = Config::default();
    config.stream.throttling = Throttling::Adaptive;
    config.stream.run_ahead_length = 4;
    config.stream.initial_run_ahead = 6;
    assert_eq!(
        config.validate(),
        Err(ConfigError::InitialRunAhead { initial: 6, max: 4 })
    );
}
