//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here. A run is described by a single
//! TOML file holding a `[simulation]` table and zero or more `[[plugins]]`
//! entries.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Result, SimError};
use crate::core::types::AgentKind;
use crate::pipeline::PluginSpec;
use crate::scoring::UnknownElementPolicy;

/// When a run stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Always take exactly `max_steps` steps, even inside an absorbing state
    StepBudget,
    /// Stop at the first absorbing state, with `max_steps` as a hard cap
    #[default]
    UntilAbsorbed,
}

/// Weight drift applied when a value element is touched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Half-width of the uniform jitter, as a fraction of the original weight
    ///
    /// At 0.05 a touch moves the weight by at most ±5% of its original value.
    pub jitter: f64,

    /// Fraction of the gap to the original weight closed after each touch
    ///
    /// Keeps long runs from wandering away from the catalog values.
    pub pull: f64,

    /// Lower clamp applied before the pull
    pub min_weight: f64,

    /// Upper clamp applied before the pull
    pub max_weight: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            jitter: 0.05,
            pull: 0.1,
            min_weight: 0.0,
            max_weight: 1.0,
        }
    }
}

/// Configuration for the simulation driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base seed; repetition `r` is seeded with `seed + r`
    pub seed: u64,

    /// Step budget per run (also the safety cap for `UntilAbsorbed`)
    pub max_steps: u64,

    /// Number of independent repetitions
    pub repetitions: u32,

    /// Agents simulated side by side in each repetition
    pub agents_per_run: u32,

    /// Role of the simulated agents, recorded on every log row
    pub agent_kind: AgentKind,

    /// Starting state; defaults to the first state of the catalog
    pub start_state: Option<String>,

    /// Extra states that end a run even without a self-loop of 1
    pub terminal_states: Vec<String>,

    pub stop_mode: StopMode,

    /// Allowed deviation of a matrix row sum from 1 before warning
    pub row_sum_tolerance: f64,

    /// What the scorer does with offering elements missing from the catalog
    pub unknown_element_policy: UnknownElementPolicy,

    /// Run repetitions on the rayon pool
    pub parallel: bool,

    pub drift: DriftConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_steps: 100,
            repetitions: 1,
            agents_per_run: 1,
            agent_kind: AgentKind::Buyer,
            start_state: None,
            terminal_states: Vec::new(),
            stop_mode: StopMode::UntilAbsorbed,
            row_sum_tolerance: 1e-6,
            unknown_element_policy: UnknownElementPolicy::DropWithWarning,
            parallel: false,
            drift: DriftConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(SimError::InvalidConfig("max_steps must be positive".into()));
        }

        if self.repetitions == 0 || self.agents_per_run == 0 {
            return Err(SimError::InvalidConfig(
                "repetitions and agents_per_run must be positive".into(),
            ));
        }

        if !(self.row_sum_tolerance.is_finite() && self.row_sum_tolerance >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "row_sum_tolerance ({}) must be a non-negative number",
                self.row_sum_tolerance
            )));
        }

        let drift = &self.drift;
        for (name, value) in [
            ("jitter", drift.jitter),
            ("min_weight", drift.min_weight),
            ("max_weight", drift.max_weight),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidConfig(format!(
                    "drift {} ({}) must be a finite number",
                    name, value
                )));
            }
        }

        if drift.jitter < 0.0 || !(0.0..=1.0).contains(&drift.pull) {
            return Err(SimError::InvalidConfig(format!(
                "drift jitter ({}) must be >= 0 and pull ({}) within [0, 1]",
                drift.jitter, drift.pull
            )));
        }

        if drift.min_weight > drift.max_weight {
            return Err(SimError::InvalidConfig(format!(
                "drift min_weight ({}) exceeds max_weight ({})",
                drift.min_weight, drift.max_weight
            )));
        }

        Ok(())
    }
}

/// Everything a run needs besides the tabular catalogs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub plugins: Vec<PluginSpec>,
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        config.simulation.validate()?;
        Ok(config)
    }

    /// Load and validate a run configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SimError::MissingInput(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
