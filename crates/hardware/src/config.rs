//! Configuration system for the timing model.
//!
//! This module defines all configuration structures and enums used to parameterize
//! a run. It provides:
//! 1. **Defaults:** Baseline widths, delays, capacities, and functional unit inventory.
//! 2. **Structures:** Hierarchical config for the pipeline, window, unit pool, stream
//!    engine, memory latency model, and progress watchdog.
//! 3. **Enums:** Stream engine mode, throttling policy, and memory controller types.
//! 4. **Validation:** `Config::validate` rejects unusable values before a run starts.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built from `Config::default()`.

use serde::{Deserialize, Serialize};

use crate::common::{ConfigError, Cycle, OpClass};

/// Default configuration constants.
///
/// These values define the baseline core when not explicitly overridden.
mod defaults {
    use crate::common::Cycle;

    /// Instructions moved per cycle by every stage.
    pub const STAGE_WIDTH: usize = 8;

    /// Fetch to decode latency in cycles.
    pub const FETCH_TO_DECODE_DELAY: Cycle = 1;

    /// Decode to rename latency in cycles.
    pub const DECODE_TO_RENAME_DELAY: Cycle = 1;

    /// Rename to issue/execute/writeback latency in cycles.
    pub const RENAME_TO_IEW_DELAY: Cycle = 2;

    /// Writeback to commit latency in cycles.
    pub const IEW_TO_COMMIT_DELAY: Cycle = 1;

    /// Fetch queue entries.
    pub const FETCH_QUEUE_SIZE: usize = 32;

    /// Decode queue entries.
    pub const DECODE_QUEUE_SIZE: usize = 32;

    /// Reorder buffer entries.
    pub const ROB_SIZE: usize = 32;

    /// Instruction queue entries.
    pub const IQ_SIZE: usize = 64;

    /// Store queue entries.
    pub const SQ_SIZE: usize = 32;

    /// Maximum prefetch elements a stream may have outstanding.
    pub const RUN_AHEAD_LENGTH: usize = 10;

    /// Prefetch requests the stream engine may issue per cycle.
    pub const PREFETCH_WIDTH: usize = 4;

    /// Late fetches that trigger a run-ahead increase under adaptive throttling.
    pub const LATE_THRESHOLD: u32 = 10;

    /// Run-ahead increase applied when the late threshold is reached.
    pub const RUN_AHEAD_INCREMENT: usize = 2;

    /// Starting run-ahead under adaptive throttling.
    pub const INITIAL_RUN_AHEAD: usize = 2;

    /// Fixed memory latency in cycles.
    pub const MEMORY_LATENCY: Cycle = 100;

    /// CAS latency in cycles.
    pub const T_CAS: Cycle = 14;

    /// RAS latency in cycles.
    pub const T_RAS: Cycle = 14;

    /// Precharge latency in cycles.
    pub const T_PRE: Cycle = 14;

    /// Consecutive cycles without progress before the watchdog fires.
    pub const STALL_LIMIT: u64 = 10_000;
}

/// Stream engine operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StreamMode {
    /// Prefetching disabled; streams are tracked for statistics only.
    Off,
    /// Perfect knowledge of future stream addresses (upper bound).
    Oracle,
    /// Stride-predicted addresses with a throttling policy.
    #[default]
    Throttled,
}

/// Run-ahead throttling policy for throttled mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Throttling {
    /// Fixed run-ahead equal to the configured length.
    #[default]
    Static,
    /// Run-ahead grows on late fetches and shrinks on waste.
    Adaptive,
}

/// Latency model of the bundled memory system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryController {
    /// Every access takes the same number of cycles.
    #[default]
    Simple,
    /// Row-buffer aware latency (CAS, RAS, precharge).
    #[serde(alias = "DRAM")]
    Dram,
}

/// Root configuration structure containing all model settings.
///
/// # Examples
///
/// ```
/// use tracesim_core::config::{Config, StreamMode};
///
/// let json = r#"{
///     "pipeline": { "fetch_width": 2 },
///     "window": { "rob_size": 4 },
///     "stream": { "mode": "Oracle", "run_ahead_length": 4 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.pipeline.fetch_width, 2);
/// assert_eq!(config.pipeline.decode_width, 8);
/// assert_eq!(config.window.rob_size, 4);
/// assert_eq!(config.stream.mode, StreamMode::Oracle);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Stage widths and inter-stage delays.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Instruction window capacities.
    #[serde(default)]
    pub window: WindowConfig,
    /// Functional unit inventory.
    #[serde(default)]
    pub fu_pool: FuPoolConfig,
    /// Stream engine parameters.
    #[serde(default)]
    pub stream: StreamConfig,
    /// Bundled memory latency model.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Progress watchdog.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

impl Config {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every width, capacity, and engine parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.window.validate()?;
        self.fu_pool.validate()?;
        self.stream.validate()?;
        self.memory.validate()?;
        self.watchdog.validate()
    }
}

/// Returns `Err(Zero)` when `value` is zero.
fn positive(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

/// Stage widths and inter-stage delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Instructions fetched per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub fetch_width: usize,
    /// Instructions decoded per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub decode_width: usize,
    /// Instructions renamed (dispatched into the ROB/IQ) per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub rename_width: usize,
    /// Instructions issued to functional units per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub issue_width: usize,
    /// Instructions retired per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub commit_width: usize,
    /// Cycles between entering the fetch queue and becoming decodable.
    #[serde(default = "PipelineConfig::default_fetch_to_decode")]
    pub fetch_to_decode_delay: Cycle,
    /// Cycles between entering the decode queue and becoming renamable.
    #[serde(default = "PipelineConfig::default_decode_to_rename")]
    pub decode_to_rename_delay: Cycle,
    /// Cycles between rename and issue eligibility.
    #[serde(default = "PipelineConfig::default_rename_to_iew")]
    pub rename_to_iew_delay: Cycle,
    /// Cycles between writeback and commit eligibility.
    #[serde(default = "PipelineConfig::default_iew_to_commit")]
    pub iew_to_commit_delay: Cycle,
}

impl PipelineConfig {
    /// Returns the default stage width.
    fn default_width() -> usize {
        defaults::STAGE_WIDTH
    }

    /// Returns the default fetch to decode delay.
    fn default_fetch_to_decode() -> Cycle {
        defaults::FETCH_TO_DECODE_DELAY
    }

    /// Returns the default decode to rename delay.
    fn default_decode_to_rename() -> Cycle {
        defaults::DECODE_TO_RENAME_DELAY
    }

    /// Returns the default rename to IEW delay.
    fn default_rename_to_iew() -> Cycle {
        defaults::RENAME_TO_IEW_DELAY
    }

    /// Returns the default IEW to commit delay.
    fn default_iew_to_commit() -> Cycle {
        defaults::IEW_TO_COMMIT_DELAY
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.fetch_width as u64, "pipeline.fetch_width")?;
        positive(self.decode_width as u64, "pipeline.decode_width")?;
        positive(self.rename_width as u64, "pipeline.rename_width")?;
        positive(self.issue_width as u64, "pipeline.issue_width")?;
        positive(self.commit_width as u64, "pipeline.commit_width")
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_width: defaults::STAGE_WIDTH,
            decode_width: defaults::STAGE_WIDTH,
            rename_width: defaults::STAGE_WIDTH,
            issue_width: defaults::STAGE_WIDTH,
            commit_width: defaults::STAGE_WIDTH,
            fetch_to_decode_delay: defaults::FETCH_TO_DECODE_DELAY,
            decode_to_rename_delay: defaults::DECODE_TO_RENAME_DELAY,
            rename_to_iew_delay: defaults::RENAME_TO_IEW_DELAY,
            iew_to_commit_delay: defaults::IEW_TO_COMMIT_DELAY,
        }
    }
}

/// Instruction window capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Fetch queue entries.
    #[serde(default = "WindowConfig::default_fetch_queue")]
    pub fetch_queue_size: usize,
    /// Decode queue entries.
    #[serde(default = "WindowConfig::default_decode_queue")]
    pub decode_queue_size: usize,
    /// Reorder buffer entries.
    #[serde(default = "WindowConfig::default_rob")]
    pub rob_size: usize,
    /// Instruction queue entries.
    #[serde(default = "WindowConfig::default_iq")]
    pub iq_size: usize,
    /// Store queue entries.
    #[serde(default = "WindowConfig::default_sq")]
    pub sq_size: usize,
}

impl WindowConfig {
    fn default_fetch_queue() -> usize {
        defaults::FETCH_QUEUE_SIZE
    }

    fn default_decode_queue() -> usize {
        defaults::DECODE_QUEUE_SIZE
    }

    fn default_rob() -> usize {
        defaults::ROB_SIZE
    }

    fn default_iq() -> usize {
        defaults::IQ_SIZE
    }

    fn default_sq() -> usize {
        defaults::SQ_SIZE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.fetch_queue_size as u64, "window.fetch_queue_size")?;
        positive(self.decode_queue_size as u64, "window.decode_queue_size")?;
        positive(self.rob_size as u64, "window.rob_size")?;
        positive(self.iq_size as u64, "window.iq_size")?;
        positive(self.sq_size as u64, "window.sq_size")
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            fetch_queue_size: defaults::FETCH_QUEUE_SIZE,
            decode_queue_size: defaults::DECODE_QUEUE_SIZE,
            rob_size: defaults::ROB_SIZE,
            iq_size: defaults::IQ_SIZE,
            sq_size: defaults::SQ_SIZE,
        }
    }
}

/// One class of functional units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuConfig {
    /// Operation class served by these units.
    pub class: OpClass,
    /// Number of identical units.
    pub count: usize,
    /// Cycles a unit stays allocated per operation.
    pub latency: Cycle,
}

/// Functional unit inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuPoolConfig {
    /// Unit classes; each operation class may appear at most once.
    #[serde(default = "FuPoolConfig::default_units")]
    pub units: Vec<FuConfig>,
}

impl FuPoolConfig {
    /// Returns the default unit inventory.
    fn default_units() -> Vec<FuConfig> {
        let unit = |class, count, latency| FuConfig {
            class,
            count,
            latency,
        };
        vec![
            unit(OpClass::IntAlu, 6, 1),
            unit(OpClass::IntMult, 2, 3),
            unit(OpClass::IntDiv, 1, 20),
            unit(OpClass::FloatAdd, 4, 2),
            unit(OpClass::FloatMult, 2, 4),
            unit(OpClass::FloatDiv, 1, 12),
            unit(OpClass::MemRead, 2, 1),
            unit(OpClass::MemWrite, 2, 1),
        ]
    }

    /// Builds a pool with a single class of units, replacing the defaults.
    pub fn single(class: OpClass, count: usize, latency: Cycle) -> Self {
        Self {
            units: vec![FuConfig {
                class,
                count,
                latency,
            }],
        }
    }

    /// Returns the configuration entry for `class`, if any.
    pub fn get(&self, class: OpClass) -> Option<&FuConfig> {
        self.units.iter().find(|u| u.class == class)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, unit) in self.units.iter().enumerate() {
            if unit.class == OpClass::Nop {
                return Err(ConfigError::NopUnit);
            }
            if self.units[..i].iter().any(|u| u.class == unit.class) {
                return Err(ConfigError::DuplicateUnit(unit.class));
            }
            positive(unit.count as u64, "fu_pool.units.count")?;
            positive(unit.latency, "fu_pool.units.latency")?;
        }
        Ok(())
    }
}

impl Default for FuPoolConfig {
    fn default() -> Self {
        Self {
            units: Self::default_units(),
        }
    }
}

/// Stream engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Operating mode.
    #[serde(default)]
    pub mode: StreamMode,
    /// Maximum prefetch elements a stream may have outstanding.
    #[serde(default = "StreamConfig::default_run_ahead")]
    pub run_ahead_length: usize,
    /// Throttling policy in throttled mode.
    #[serde(default)]
    pub throttling: Throttling,
    /// Prefetch requests issued per cycle across all streams.
    #[serde(default = "StreamConfig::default_prefetch_width")]
    pub prefetch_width: usize,
    /// Late fetches before the adaptive policy widens the run-ahead.
    #[serde(default = "StreamConfig::default_late_threshold")]
    pub late_threshold: u32,
    /// Run-ahead increase applied by the adaptive policy.
    #[serde(default = "StreamConfig::default_increment")]
    pub run_ahead_increment: usize,
    /// Starting run-ahead under the adaptive policy.
    #[serde(default = "StreamConfig::default_initial_run_ahead")]
    pub initial_run_ahead: usize,
}

impl StreamConfig {
    fn default_run_ahead() -> usize {
        defaults::RUN_AHEAD_LENGTH
    }

    fn default_prefetch_width() -> usize {
        defaults::PREFETCH_WIDTH
    }

    fn default_late_threshold() -> u32 {
        defaults::LATE_THRESHOLD
    }

    fn default_increment() -> usize {
        defaults::RUN_AHEAD_INCREMENT
    }

    fn default_initial_run_ahead() -> usize {
        defaults::INITIAL_RUN_AHEAD
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.run_ahead_length as u64, "stream.run_ahead_length")?;
        positive(self.prefetch_width as u64, "stream.prefetch_width")?;
        if self.mode == StreamMode::Throttled && self.throttling == Throttling::Adaptive {
            positive(u64::from(self.late_threshold), "stream.late_threshold")?;
            positive(self.run_ahead_increment as u64, "stream.run_ahead_increment")?;
            positive(self.initial_run_ahead as u64, "stream.initial_run_ahead")?;
            if self.initial_run_ahead > self.run_ahead_length {
                return Err(ConfigError::InitialRunAhead {
                    initial: self.initial_run_ahead,
                    max: self.run_ahead_length,
                });
            }
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: StreamMode::default(),
            run_ahead_length: defaults::RUN_AHEAD_LENGTH,
            throttling: Throttling::default(),
            prefetch_width: defaults::PREFETCH_WIDTH,
            late_threshold: defaults::LATE_THRESHOLD,
            run_ahead_increment: defaults::RUN_AHEAD_INCREMENT,
            initial_run_ahead: defaults::INITIAL_RUN_AHEAD,
        }
    }
}

/// Latency model of the bundled memory system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Controller type.
    #[serde(default)]
    pub controller: MemoryController,
    /// Fixed latency for the simple controller.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: Cycle,
    /// CAS latency for the DRAM controller.
    #[serde(default = "MemoryConfig::default_t_cas")]
    pub t_cas: Cycle,
    /// RAS latency for the DRAM controller.
    #[serde(default = "MemoryConfig::default_t_ras")]
    pub t_ras: Cycle,
    /// Precharge latency for the DRAM controller.
    #[serde(default = "MemoryConfig::default_t_pre")]
    pub t_pre: Cycle,
}

impl MemoryConfig {
    fn default_latency() -> Cycle {
        defaults::MEMORY_LATENCY
    }

    fn default_t_cas() -> Cycle {
        defaults::T_CAS
    }

    fn default_t_ras() -> Cycle {
        defaults::T_RAS
    }

    fn default_t_pre() -> Cycle {
        defaults::T_PRE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.controller {
            MemoryController::Simple => positive(self.latency, "memory.latency"),
            MemoryController::Dram => positive(self.t_cas, "memory.t_cas"),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            controller: MemoryController::default(),
            latency: defaults::MEMORY_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
        }
    }
}

/// Progress watchdog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Consecutive cycles without any progress before the run is aborted.
    #[serde(default = "WatchdogConfig::default_stall_limit")]
    pub stall_limit: u64,
    /// Optional hard bound on the total cycle count.
    #[serde(default)]
    pub max_cycles: Option<Cycle>,
}

impl WatchdogConfig {
    fn default_stall_limit() -> u64 {
        defaults::STALL_LIMIT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.stall_limit, "watchdog.stall_limit")?;
        if let Some(limit) = self.max_cycles {
            positive(limit, "watchdog.max_cycles")?;
        }
        Ok(())
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            stall_limit: defaults::STALL_LIMIT,
            max_cycles: None,
        }
    }
}
