//! Population synthesis under trait-distribution constraints.
//!
//! A [`PopulationGenerator`] turns an agent count and a
//! [`DistributionSpec`] into a fresh set of agents:
//!
//! 1. Sample each agent's traits. A biased trait is the bias value plus a
//!    jitter of -1, 0 or +1, clamped to `1..=10`; an unbiased trait is
//!    uniform in `1..=10`.
//! 2. For grouped specs, each group contributes `round(pct / 100 * N)`
//!    agents in order; sampling stops once N agents exist and any shortfall
//!    is filled with unbiased agents.
//! 3. Place agents on a ring around the canvas centre.
//! 4. Wire the topology: each agent connects to `floor(E / 3) + 1` distinct
//!    other agents chosen at random.

use std::collections::BTreeSet;
use std::f64::consts::TAU;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::debug;

use cohort_types::{
    Agent, AgentId, DistributionSpec, IdAllocator, Link, TRAIT_MAX, TRAIT_MIN, TraitBias,
    TraitKind, Traits, Vec2,
};

use crate::archetype;
use crate::config::PopulationConfig;
use crate::error::PopulationError;

// ---------------------------------------------------------------------------
// Name, role, and culture pools
// ---------------------------------------------------------------------------

/// Base names, assigned by position and suffixed with three random digits.
pub const NAMES: [&str; 26] = [
    "Ada", "Felix", "Mira", "Kai", "Zara", "Leo", "Nova", "Ravi", "Elsa", "Omar", "Yuki", "Sven",
    "Dara", "Emil", "Luna", "Hugo", "Iris", "Niko", "Cleo", "Axel", "Sage", "Remy", "Wren", "Juno",
    "Ezra", "Thea",
];

/// Social roles drawn uniformly at random.
pub const ROLES: [&str; 12] = [
    "Student",
    "Teacher",
    "Executive",
    "Nurse",
    "Engineer",
    "Artist",
    "Journalist",
    "Scientist",
    "Lawyer",
    "Activist",
    "Chef",
    "Architect",
];

/// Cultural backgrounds drawn uniformly at random.
pub const CULTURES: [&str; 8] = [
    "Urban American",
    "Rural American",
    "Western European",
    "East Asian",
    "South Asian",
    "Latin American",
    "Nordic",
    "Southeast Asian",
];

// ---------------------------------------------------------------------------
// Trait sampling
// ---------------------------------------------------------------------------

/// Sample one trait vector under an optional bias map.
pub fn sample_traits(bias: &TraitBias, rng: &mut impl Rng) -> Traits {
    let mut traits = Traits::default();
    for kind in TraitKind::ALL {
        let value = match bias.get(&kind) {
            Some(&centre) => {
                let jitter: i16 = rng.random_range(-1..=1);
                let jittered = i16::from(centre)
                    .saturating_add(jitter)
                    .clamp(i16::from(TRAIT_MIN), i16::from(TRAIT_MAX));
                u8::try_from(jittered).unwrap_or(TRAIT_MIN)
            }
            None => rng.random_range(TRAIT_MIN..=TRAIT_MAX),
        };
        traits.set(kind, value);
    }
    traits
}

/// Number of connections an agent with this extraversion gets.
pub fn connection_count(extraversion: u8) -> usize {
    usize::from(extraversion.checked_div(3).unwrap_or(0)).saturating_add(1)
}

/// Pick from a pool by position, wrapping around.
pub(crate) fn cycle_pick<'a>(pool: &[&'a str], index: usize) -> &'a str {
    index
        .checked_rem(pool.len())
        .and_then(|i| pool.get(i))
        .copied()
        .unwrap_or_default()
}

/// Starting position for agent `index` of `count` on the ring.
pub fn ring_position(index: usize, count: usize, config: &PopulationConfig, rng: &mut impl Rng) -> Vec2 {
    let angle = if count == 0 {
        0.0
    } else {
        index as f64 / count as f64 * TAU
    };
    let radius = rng.random::<f64>().mul_add(config.ring_spread, config.ring_radius);
    Vec2::new(angle.cos().mul_add(radius, 0.5), angle.sin().mul_add(radius, 0.5))
}

/// Convert a group share into a head count, `round(pct / 100 * count)`.
///
/// `pct` must already be validated as finite and non-negative.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn group_size(pct: f64, count: usize) -> usize {
    let total = count as f64;
    // Clamped into [0, count] so the cast cannot wrap or truncate.
    (total * pct / 100.0).round().clamp(0.0, total) as usize
}

/// Reject group specs with shares that are negative or not finite.
pub fn validate_spec(spec: &DistributionSpec) -> Result<(), PopulationError> {
    if let DistributionSpec::Groups(groups) = spec {
        for (index, group) in groups.iter().enumerate() {
            if !group.pct.is_finite() || group.pct < 0.0 {
                return Err(PopulationError::InvalidGroupShare {
                    index,
                    pct: group.pct,
                });
            }
        }
    }
    Ok(())
}

/// Expand a distribution spec into one bias map per agent slot.
fn plan_biases(count: usize, spec: &DistributionSpec) -> Vec<TraitBias> {
    match spec {
        DistributionSpec::Uniform => vec![TraitBias::new(); count],
        DistributionSpec::Bias(bias) => vec![bias.clone(); count],
        DistributionSpec::Groups(groups) => {
            let mut plan = Vec::with_capacity(count);
            for group in groups {
                let n = group_size(group.pct, count);
                for _ in 0..n {
                    if plan.len() >= count {
                        break;
                    }
                    plan.push(group.bias.clone());
                }
            }
            plan.resize(count, TraitBias::new());
            plan
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Synthesizes agent populations for one run.
///
/// Borrows the run's id allocator so agent ids are scoped to the session.
pub struct PopulationGenerator<'a> {
    config: PopulationConfig,
    ids: &'a dyn IdAllocator,
}

impl<'a> PopulationGenerator<'a> {
    /// Create a generator that mints agent ids from `ids`.
    pub const fn new(config: PopulationConfig, ids: &'a dyn IdAllocator) -> Self {
        Self { config, ids }
    }

    /// Generate `count` agents following `spec`, then wire their topology.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::EmptyPopulation`] for `count == 0` and
    /// [`PopulationError::InvalidGroupShare`] for malformed group specs.
    pub fn generate(
        &self,
        count: usize,
        spec: &DistributionSpec,
        rng: &mut impl Rng,
    ) -> Result<Vec<Agent>, PopulationError> {
        if count == 0 {
            return Err(PopulationError::EmptyPopulation);
        }
        validate_spec(spec)?;

        let mut agents: Vec<Agent> = plan_biases(count, spec)
            .iter()
            .enumerate()
            .map(|(index, bias)| self.make_agent(index, count, bias, rng))
            .collect();

        wire_connections(&mut agents, rng);

        debug!(count, "population generated");
        Ok(agents)
    }

    /// Build one agent at ring slot `index`.
    fn make_agent(&self, index: usize, count: usize, bias: &TraitBias, rng: &mut impl Rng) -> Agent {
        let traits = sample_traits(bias, rng);
        let suffix: u16 = rng.random_range(100..=999);
        let name = format!("{}-{suffix}", cycle_pick(&NAMES, index));

        let mut agent = Agent::new(
            AgentId::allocate(self.ids),
            name,
            traits,
            archetype::derive(traits),
            self.config.history,
        );
        agent.role = ROLES.choose(rng).copied().unwrap_or_default().to_owned();
        agent.culture = CULTURES.choose(rng).copied().unwrap_or_default().to_owned();
        agent.position = ring_position(index, count, &self.config, rng);
        agent
    }
}

/// Give every agent `floor(E / 3) + 1` distinct random connections.
///
/// Agents with more allotted connections than available peers connect to
/// every other agent.
pub fn wire_connections(agents: &mut [Agent], rng: &mut impl Rng) {
    let ids: Vec<AgentId> = agents.iter().map(|a| a.id).collect();
    for agent in agents.iter_mut() {
        let mut others: Vec<AgentId> = ids.iter().copied().filter(|id| *id != agent.id).collect();
        others.shuffle(rng);
        let wanted = connection_count(agent.traits.extraversion);
        agent.connections = others.into_iter().take(wanted).collect::<BTreeSet<_>>();
    }
}

/// Derive the link list from the agents' connection sets.
///
/// Edges are emitted per directed connection and not deduplicated, so a
/// mutual connection appears twice.
pub fn links_of(agents: &[Agent]) -> Vec<Link<AgentId>> {
    agents
        .iter()
        .flat_map(|a| {
            a.connections.iter().map(move |target| Link {
                source: a.id,
                target: *target,
                weight: 1.0,
            })
        })
        .collect()
}
