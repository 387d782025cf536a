//! External population import.
//!
//! An upstream persona source may hand us agents with demographic fields
//! and continuous (float) OCEAN scores instead of letting the
//! [`PopulationGenerator`](crate::PopulationGenerator) synthesize them.
//! Before use every persona is normalized: floats are rounded and clamped
//! into integer traits, omitted fields are synthesized, and the archetype
//! is derived.
//!
//! When the source returns fewer personas than requested the shortfall is
//! padded with deterministic fallback personas. When every persona carries
//! the same political leaning the leanings are rebalanced across the
//! spectrum so downstream debates are not one-sided.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cohort_types::{Agent, AgentId, IdAllocator, TRAIT_MAX, TRAIT_MIN, Traits};

use crate::archetype;
use crate::config::PopulationConfig;
use crate::error::PopulationError;
use crate::population::{cycle_pick, ring_position};

const FALLBACK_NAMES: [&str; 10] = [
    "Alex", "Sam", "Jordan", "Morgan", "Casey", "Riley", "Quinn", "Avery", "Parker", "Drew",
];
const FALLBACK_JOBS: [&str; 5] = ["teacher", "nurse", "developer", "driver", "retail worker"];
const FALLBACK_LOCATIONS: [&str; 5] = ["London", "Manchester", "Birmingham", "Leeds", "Bristol"];
const FALLBACK_INCOMES: [&str; 4] = ["low", "medium", "high", "very high"];

/// The political spectrum used for fallbacks and rebalancing.
pub const LEANINGS: [&str; 5] = ["left", "centre-left", "centre", "centre-right", "right"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Continuous Big Five scores as an external source reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocean {
    /// Openness.
    pub openness: f64,
    /// Conscientiousness.
    pub conscientiousness: f64,
    /// Extraversion.
    pub extraversion: f64,
    /// Agreeableness.
    pub agreeableness: f64,
    /// Neuroticism.
    pub neuroticism: f64,
}

impl Default for Ocean {
    fn default() -> Self {
        Self {
            openness: 5.0,
            conscientiousness: 5.0,
            extraversion: 5.0,
            agreeableness: 5.0,
            neuroticism: 5.0,
        }
    }
}

impl Ocean {
    /// Round and clamp every score into the integer `1..=10` range.
    pub fn to_traits(&self) -> Traits {
        Traits {
            openness: normalize_score(self.openness),
            conscientiousness: normalize_score(self.conscientiousness),
            extraversion: normalize_score(self.extraversion),
            agreeableness: normalize_score(self.agreeableness),
            neuroticism: normalize_score(self.neuroticism),
        }
    }
}

/// Round one continuous score into `1..=10`; non-finite values become 5.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 5;
    }
    // Clamped into [1, 10] so the cast is exact.
    value
        .round()
        .clamp(f64::from(TRAIT_MIN), f64::from(TRAIT_MAX)) as u8
}

/// One persona as produced by an external population source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalPersona {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Occupation; becomes the agent's role.
    pub occupation: String,
    /// Income bracket label.
    pub income_bracket: String,
    /// Political leaning label.
    pub political_leaning: String,
    /// Home location; becomes the agent's culture.
    pub location: String,
    /// Continuous personality scores.
    pub ocean: Ocean,
}

impl Default for ExternalPersona {
    fn default() -> Self {
        Self {
            name: String::from("Agent"),
            age: 35,
            occupation: String::from("worker"),
            income_bracket: String::from("medium"),
            political_leaning: String::from("centre"),
            location: String::from("London"),
            ocean: Ocean::default(),
        }
    }
}

/// Deterministic stand-in persona for slot `index`.
pub fn fallback_persona(index: usize) -> ExternalPersona {
    let wrap = |offset: usize, modulus: usize, base: usize| {
        index
            .saturating_add(offset)
            .checked_rem(modulus)
            .unwrap_or(0)
            .saturating_add(base) as f64
    };
    ExternalPersona {
        name: format!("{}{index}", cycle_pick(&FALLBACK_NAMES, index)),
        age: u32::try_from(index.checked_rem(40).unwrap_or(0))
            .unwrap_or(0)
            .saturating_add(28),
        occupation: cycle_pick(&FALLBACK_JOBS, index).to_owned(),
        income_bracket: cycle_pick(&FALLBACK_INCOMES, index).to_owned(),
        political_leaning: cycle_pick(&LEANINGS, index).to_owned(),
        location: cycle_pick(&FALLBACK_LOCATIONS, index).to_owned(),
        ocean: Ocean {
            openness: wrap(0, 6, 4),
            conscientiousness: wrap(2, 6, 4),
            extraversion: wrap(3, 7, 3),
            agreeableness: wrap(4, 7, 3),
            neuroticism: wrap(5, 8, 2),
        },
    }
}

/// Spread leanings across the spectrum if they all collapsed to one value.
///
/// Returns `true` if the personas were rewritten.
pub fn rebalance_leanings(personas: &mut [ExternalPersona]) -> bool {
    let distinct: BTreeSet<String> = personas
        .iter()
        .map(|p| p.political_leaning.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    if personas.is_empty() || distinct.len() > 1 {
        return false;
    }
    for (i, persona) in personas.iter_mut().enumerate() {
        cycle_pick(&LEANINGS, i).clone_into(&mut persona.political_leaning);
    }
    true
}

/// Parse a JSON array of personas, skipping entries that are not objects.
///
/// # Errors
///
/// Returns [`PopulationError::InvalidPersonaPayload`] if the payload is
/// not a JSON array.
pub fn parse_personas(raw: &str) -> Result<Vec<ExternalPersona>, PopulationError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut personas = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        if !value.is_object() {
            continue;
        }
        match serde_json::from_value::<ExternalPersona>(value) {
            Ok(persona) => personas.push(persona),
            Err(err) => warn!(index = i, error = %err, "skipping malformed persona"),
        }
    }
    Ok(personas)
}

/// Pad or truncate to exactly `count` personas, then rebalance leanings.
pub fn complete_personas(mut personas: Vec<ExternalPersona>, count: usize) -> Vec<ExternalPersona> {
    personas.truncate(count);
    let provided = personas.len();
    while personas.len() < count {
        personas.push(fallback_persona(personas.len().saturating_sub(provided)));
    }
    if provided < count {
        debug!(provided, padded = count.saturating_sub(provided), "padded external population");
    }
    if rebalance_leanings(&mut personas) {
        debug!(count, "rebalanced collapsed political leanings");
    }
    personas
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turns external personas into simulation agents.
pub struct PersonaImporter<'a> {
    config: PopulationConfig,
    ids: &'a dyn IdAllocator,
}

impl<'a> PersonaImporter<'a> {
    /// Create an importer that mints agent ids from `ids`.
    pub const fn new(config: PopulationConfig, ids: &'a dyn IdAllocator) -> Self {
        Self { config, ids }
    }

    /// Normalize one persona into an agent at ring slot `index` of `count`.
    pub fn to_agent(
        &self,
        persona: &ExternalPersona,
        index: usize,
        count: usize,
        rng: &mut impl Rng,
    ) -> Agent {
        let traits = persona.ocean.to_traits();
        let mut agent = Agent::new(
            AgentId::allocate(self.ids),
            persona.name.clone(),
            traits,
            archetype::derive(traits),
            self.config.history,
        );
        agent.role.clone_from(&persona.occupation);
        agent.culture.clone_from(&persona.location);
        agent.attributes.insert(String::from("age"), persona.age.to_string());
        agent
            .attributes
            .insert(String::from("income_bracket"), persona.income_bracket.clone());
        agent
            .attributes
            .insert(String::from("political_leaning"), persona.political_leaning.clone());
        agent.position = ring_position(index, count, &self.config, rng);
        agent
    }

    /// Import exactly `count` agents from `personas`.
    ///
    /// Connections are wired the same way as for synthesized populations.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::EmptyPopulation`] for `count == 0`.
    pub fn import(
        &self,
        personas: Vec<ExternalPersona>,
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Agent>, PopulationError> {
        if count == 0 {
            return Err(PopulationError::EmptyPopulation);
        }
        let personas = complete_personas(personas, count);
        let mut agents: Vec<Agent> = personas
            .iter()
            .enumerate()
            .map(|(i, p)| self.to_agent(p, i, count, rng))
            .collect();
        crate::population::wire_connections(&mut agents, rng);
        Ok(agents)
    }
}
