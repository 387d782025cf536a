//! Configuration loading and typed config structures for Cohort.
//!
//! The canonical configuration lives in `cohort-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and
//! provides a loader that reads the file and applies environment
//! overrides. Every section and field has a default, so an empty file (or
//! no file at all) yields a runnable two-condition experiment.

use std::path::Path;

use serde::Deserialize;

use cohort_agents::PopulationConfig;
use cohort_types::{Condition, DistributionSpec, GroupSpec, HistoryCaps, TraitBias, TraitKind};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `cohort-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CohortConfig {
    /// Run sizing, pacing, and decision dispatch.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// History buffer capacities.
    #[serde(default)]
    pub history: HistorySettings,

    /// Spatial layout force constants.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Ordered experimental conditions.
    #[serde(default = "default_conditions")]
    pub conditions: Vec<Condition>,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverSettings,

    /// Live feed aggregation.
    #[serde(default)]
    pub stream: StreamSettings,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            history: HistorySettings::default(),
            layout: LayoutConfig::default(),
            conditions: default_conditions(),
            observer: ObserverSettings::default(),
            stream: StreamSettings::default(),
        }
    }
}

impl CohortConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `COHORT_OBSERVER_PORT` overrides `observer.port`
    /// - `COHORT_SEED` overrides `simulation.seed`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply `COHORT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("COHORT_OBSERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            self.observer.port = port;
        }
        if let Some(seed) = std::env::var("COHORT_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.simulation.seed = Some(seed);
        }
    }

    /// Population tunables derived from the history section.
    pub const fn population(&self) -> PopulationConfig {
        PopulationConfig {
            history: self.history.caps(),
            ring_radius: 0.2,
            ring_spread: 0.2,
        }
    }
}

/// Run sizing, pacing, and decision dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSettings {
    /// Agents per condition.
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Ticks executed per condition.
    #[serde(default = "default_ticks_per_condition")]
    pub ticks_per_condition: u64,

    /// Pause after each committed tick, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Pause between conditions, in milliseconds.
    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,

    /// Per-call decision deadline, in milliseconds.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Smallest subset of agents acting in one tick.
    #[serde(default = "default_min_selected")]
    pub min_selected: usize,

    /// Largest subset of agents acting in one tick.
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,

    /// How many recent global log entries each decision request carries.
    #[serde(default = "default_recent_action_window")]
    pub recent_action_window: usize,

    /// The stimulus agents react to.
    #[serde(default = "default_context")]
    pub context: String,

    /// RNG seed; `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            ticks_per_condition: default_ticks_per_condition(),
            tick_interval_ms: default_tick_interval_ms(),
            settle_interval_ms: default_settle_interval_ms(),
            decision_timeout_ms: default_decision_timeout_ms(),
            min_selected: default_min_selected(),
            max_selected: default_max_selected(),
            recent_action_window: default_recent_action_window(),
            context: default_context(),
            seed: None,
        }
    }
}

/// History buffer capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistorySettings {
    /// Sentiment history cap.
    #[serde(default = "default_sentiment_cap")]
    pub sentiment_cap: usize,

    /// Stance history cap.
    #[serde(default = "default_stance_cap")]
    pub stance_cap: usize,

    /// Recent-memory cap.
    #[serde(default = "default_memory_cap")]
    pub memory_cap: usize,

    /// How many log entries the observer serves at most.
    #[serde(default = "default_interaction_log_view")]
    pub interaction_log_view: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            sentiment_cap: default_sentiment_cap(),
            stance_cap: default_stance_cap(),
            memory_cap: default_memory_cap(),
            interaction_log_view: default_interaction_log_view(),
        }
    }
}

impl HistorySettings {
    /// Agent history capacities.
    pub const fn caps(&self) -> HistoryCaps {
        HistoryCaps {
            sentiment: self.sentiment_cap,
            stance: self.stance_cap,
            memory: self.memory_cap,
        }
    }
}

/// Force constants for the spatial layout relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LayoutConfig {
    /// Pairwise repulsion strength.
    #[serde(default = "default_repulsion")]
    pub repulsion: f64,

    /// Spring strength toward connected agents.
    #[serde(default = "default_attraction")]
    pub attraction: f64,

    /// Pull toward the agent's group centroid.
    #[serde(default = "default_cohesion")]
    pub cohesion: f64,

    /// Pull toward the canvas midpoint.
    #[serde(default = "default_centering")]
    pub centering: f64,

    /// Velocity retained each step.
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Distance floor for the repulsion term.
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,

    /// Lowest coordinate a position may take.
    #[serde(default = "default_bound_min")]
    pub bound_min: f64,

    /// Highest coordinate a position may take.
    #[serde(default = "default_bound_max")]
    pub bound_max: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: default_repulsion(),
            attraction: default_attraction(),
            cohesion: default_cohesion(),
            centering: default_centering(),
            damping: default_damping(),
            min_distance: default_min_distance(),
            bound_min: default_bound_min(),
            bound_max: default_bound_max(),
        }
    }
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverSettings {
    /// Whether to start the observer at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Live feed aggregation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StreamSettings {
    /// Reasoning entries kept per agent.
    #[serde(default = "default_reasoning_history_cap")]
    pub reasoning_history_cap: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reasoning_history_cap: default_reasoning_history_cap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_agent_count() -> usize {
    16
}

const fn default_ticks_per_condition() -> u64 {
    12
}

const fn default_tick_interval_ms() -> u64 {
    200
}

const fn default_settle_interval_ms() -> u64 {
    500
}

const fn default_decision_timeout_ms() -> u64 {
    7000
}

const fn default_min_selected() -> usize {
    2
}

const fn default_max_selected() -> usize {
    4
}

const fn default_recent_action_window() -> usize {
    8
}

fn default_context() -> String {
    String::from("A new city policy proposes converting downtown parking into public green space.")
}

const fn default_sentiment_cap() -> usize {
    50
}

const fn default_stance_cap() -> usize {
    50
}

const fn default_memory_cap() -> usize {
    20
}

const fn default_interaction_log_view() -> usize {
    300
}

const fn default_repulsion() -> f64 {
    0.0008
}

const fn default_attraction() -> f64 {
    0.002
}

const fn default_cohesion() -> f64 {
    0.012
}

const fn default_centering() -> f64 {
    0.003
}

const fn default_damping() -> f64 {
    0.8
}

const fn default_min_distance() -> f64 {
    0.01
}

const fn default_bound_min() -> f64 {
    0.05
}

const fn default_bound_max() -> f64 {
    0.95
}

const fn default_true() -> bool {
    true
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

const fn default_reasoning_history_cap() -> usize {
    10
}

/// Uniform control plus a 50/50 agreeableness split.
fn default_conditions() -> Vec<Condition> {
    let agreeable: TraitBias = [(TraitKind::Agreeableness, 8)].into_iter().collect();
    let disagreeable: TraitBias = [(TraitKind::Agreeableness, 3)].into_iter().collect();
    vec![
        Condition {
            name: String::from("Uniform Random"),
            distribution: DistributionSpec::Uniform,
        },
        Condition {
            name: String::from("50/50 Agree Split"),
            distribution: DistributionSpec::Groups(vec![
                GroupSpec {
                    pct: 50.0,
                    bias: agreeable,
                },
                GroupSpec {
                    pct: 50.0,
                    bias: disagreeable,
                },
            ]),
        },
    ]
}
