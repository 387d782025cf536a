//! Core entity structs for the Cohort simulation.
//!
//! Agents and their personality vectors, links, groups, the per-tick time
//! series, the interaction log, decisions, and the experiment condition
//! types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Archetype, GroupKind, Stance, TraitKind};
use crate::history::BoundedHistory;
use crate::ids::{AgentId, ConditionId, LogEntryId};

/// Lowest legal trait score.
pub const TRAIT_MIN: u8 = 1;

/// Highest legal trait score.
pub const TRAIT_MAX: u8 = 10;

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Big Five personality scores, each an integer in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Traits {
    /// Openness.
    #[serde(rename = "O")]
    pub openness: u8,
    /// Conscientiousness.
    #[serde(rename = "C")]
    pub conscientiousness: u8,
    /// Extraversion.
    #[serde(rename = "E")]
    pub extraversion: u8,
    /// Agreeableness.
    #[serde(rename = "A")]
    pub agreeableness: u8,
    /// Neuroticism.
    #[serde(rename = "N")]
    pub neuroticism: u8,
}

impl Traits {
    /// Build a trait vector, clamping every score into `1..=10`.
    pub fn clamped(o: u8, c: u8, e: u8, a: u8, n: u8) -> Self {
        let f = |v: u8| v.clamp(TRAIT_MIN, TRAIT_MAX);
        Self {
            openness: f(o),
            conscientiousness: f(c),
            extraversion: f(e),
            agreeableness: f(a),
            neuroticism: f(n),
        }
    }

    /// Read one dimension.
    pub const fn get(self, kind: TraitKind) -> u8 {
        match kind {
            TraitKind::Openness => self.openness,
            TraitKind::Conscientiousness => self.conscientiousness,
            TraitKind::Extraversion => self.extraversion,
            TraitKind::Agreeableness => self.agreeableness,
            TraitKind::Neuroticism => self.neuroticism,
        }
    }

    /// Overwrite one dimension, clamping into `1..=10`.
    pub fn set(&mut self, kind: TraitKind, value: u8) {
        let value = value.clamp(TRAIT_MIN, TRAIT_MAX);
        match kind {
            TraitKind::Openness => self.openness = value,
            TraitKind::Conscientiousness => self.conscientiousness = value,
            TraitKind::Extraversion => self.extraversion = value,
            TraitKind::Agreeableness => self.agreeableness = value,
            TraitKind::Neuroticism => self.neuroticism = value,
        }
    }

    /// Whether every score lies within `1..=10`.
    pub fn in_bounds(self) -> bool {
        TraitKind::ALL
            .into_iter()
            .all(|k| (TRAIT_MIN..=TRAIT_MAX).contains(&self.get(k)))
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self::clamped(5, 5, 5, 5, 5)
    }
}

/// Per-trait bias: the centre value to sample a trait around.
pub type TraitBias = BTreeMap<TraitKind, u8>;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point or vector on the normalized `[0, 1]` layout plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// The origin / zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a vector.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Capacities for an agent's rolling histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCaps {
    /// Sentiment history cap.
    pub sentiment: usize,
    /// Stance history cap.
    pub stance: usize,
    /// Recent-memory cap.
    pub memory: usize,
}

impl Default for HistoryCaps {
    fn default() -> Self {
        Self {
            sentiment: 50,
            stance: 50,
            memory: 20,
        }
    }
}

/// A synthetic social agent.
///
/// Sentiment, stance and memory are only written by the turn scheduler's
/// commit phase; position and velocity only by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Big Five scores.
    pub traits: Traits,
    /// Occupation or social role.
    pub role: String,
    /// Cultural background or home region.
    pub culture: String,
    /// Further demographic attributes (age, income bracket, leaning, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Derived personality label.
    pub archetype: Archetype,
    /// Layout position.
    pub position: Vec2,
    /// Layout velocity.
    pub velocity: Vec2,
    /// Current sentiment toward the stimulus, in `[-1, 1]`.
    pub sentiment: f64,
    /// Past sentiments, newest last.
    pub sentiment_history: BoundedHistory<f64>,
    /// Past stances, newest last.
    pub stance_history: BoundedHistory<Stance>,
    /// Recent actions the agent remembers taking.
    pub memory: BoundedHistory<String>,
    /// The last action the agent took.
    pub last_action: Option<String>,
    /// The last thought the agent had.
    pub last_thought: Option<String>,
    /// Agents this one is connected to (not guaranteed symmetric).
    pub connections: BTreeSet<AgentId>,
}

impl Agent {
    /// Create an agent with neutral sentiment and empty histories.
    pub fn new(
        id: AgentId,
        name: String,
        traits: Traits,
        archetype: Archetype,
        caps: HistoryCaps,
    ) -> Self {
        Self {
            id,
            name,
            traits,
            role: String::new(),
            culture: String::new(),
            attributes: BTreeMap::new(),
            archetype,
            position: Vec2::new(0.5, 0.5),
            velocity: Vec2::ZERO,
            sentiment: 0.0,
            sentiment_history: BoundedHistory::with_capacity(caps.sentiment),
            stance_history: BoundedHistory::with_capacity(caps.stance),
            memory: BoundedHistory::with_capacity(caps.memory),
            last_action: None,
            last_thought: None,
            connections: BTreeSet::new(),
        }
    }

    /// Share of cooperative stances in the stance history.
    ///
    /// Returns `0.5` when the agent has not taken a stance yet.
    pub fn cooperation_ratio(&self) -> f64 {
        if self.stance_history.is_empty() {
            return 0.5;
        }
        let cooperative = self
            .stance_history
            .iter()
            .filter(|s| s.is_cooperative())
            .count();
        cooperative as f64 / self.stance_history.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Links and groups
// ---------------------------------------------------------------------------

/// A weighted edge between two agents.
///
/// Generic over the identifier so the live feed (which names agents with
/// feed-assigned strings) can share the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Link<I> {
    /// Originating agent.
    pub source: I,
    /// Receiving agent.
    pub target: I,
    /// Edge weight.
    pub weight: f64,
}

/// A sentiment group, recomputed from scratch every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Group {
    /// Which bucket this is; also serves as the group's id.
    pub id: GroupKind,
    /// Display label.
    pub label: String,
    /// Display colour.
    pub color: String,
    /// Members (always at least two).
    pub members: BTreeSet<AgentId>,
}

// ---------------------------------------------------------------------------
// Time series and interaction log
// ---------------------------------------------------------------------------

/// Aggregate metrics for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeSeriesPoint {
    /// Tick number (1-based).
    pub tick: u64,
    /// Mean sentiment over all agents.
    pub avg_sentiment: f64,
    /// Sentiment dispersion in `[0, 1]`.
    pub polarization: f64,
    /// Cooperation rate as a percentage (0-100).
    pub cooperation_pct: f64,
    /// Number of groups detected.
    pub group_count: u32,
}

/// One committed agent decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// Entry identifier.
    pub id: LogEntryId,
    /// Tick during which the decision was committed.
    pub tick: u64,
    /// Acting agent.
    pub agent_id: AgentId,
    /// Acting agent's display name.
    pub agent_name: String,
    /// What the agent did.
    pub action: String,
    /// What the agent thought.
    pub thought: String,
    /// Sentiment after the decision.
    pub sentiment: f64,
    /// Stance taken.
    pub stance: Stance,
    /// Whether this entry is a substituted fallback decision.
    pub fallback: bool,
    /// Wall-clock commit time.
    pub recorded_at: DateTime<Utc>,
}

/// A validated decision returned by a decision provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// Internal monologue.
    pub thought: String,
    /// Outward action.
    pub action: String,
    /// New sentiment, in `[-1, 1]`.
    pub sentiment: f64,
    /// Categorical stance.
    pub stance: Stance,
}

impl Decision {
    /// The structurally valid default committed when a provider fails.
    pub fn neutral_fallback() -> Self {
        Self {
            thought: String::from("Processing..."),
            action: String::from("Observing."),
            sentiment: 0.0,
            stance: Stance::Neutral,
        }
    }
}

// ---------------------------------------------------------------------------
// Experiments
// ---------------------------------------------------------------------------

/// One weighted sub-population in a grouped distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupSpec {
    /// Share of the population, in percent.
    pub pct: f64,
    /// Trait bias for this sub-population.
    #[serde(default)]
    pub bias: TraitBias,
}

/// How a condition's population traits are sampled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    /// Every trait uniform in `1..=10`.
    #[default]
    Uniform,
    /// One bias map applied to the whole population.
    Bias(TraitBias),
    /// An ordered list of sub-populations.
    Groups(Vec<GroupSpec>),
}

/// A named experimental configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Condition {
    /// Display name.
    pub name: String,
    /// Trait distribution for this condition's population.
    #[serde(default)]
    pub distribution: DistributionSpec,
}

/// The immutable outcome of one condition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConditionResult {
    /// Identifier of this condition run.
    pub condition_id: ConditionId,
    /// Condition name.
    pub condition_name: String,
    /// Final agent states.
    pub agents: Vec<Agent>,
    /// Final mean sentiment.
    pub avg_sentiment: f64,
    /// Final polarization.
    pub polarization: f64,
    /// Final cooperation rate (0-1).
    pub cooperation_rate: f64,
    /// Final number of groups.
    pub group_count: u32,
    /// Ticks executed.
    pub tick_count: u64,
    /// Every committed decision, in commit order.
    pub log: Vec<LogEntry>,
    /// Per-tick metrics.
    pub time_series: Vec<TimeSeriesPoint>,
    /// When the result was captured.
    pub captured_at: DateTime<Utc>,
}
