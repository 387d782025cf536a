//! Population synthesis and agent state updates for the Cohort simulation.
//!
//! This crate contains the logic layer for agents -- everything that operates
//! on agent state without touching I/O or the tick loop. It sits between
//! `cohort-types` (which defines the data structures) and `cohort-core`
//! (which orchestrates runs).
//!
//! # Modules
//!
//! - [`agent`] -- Committing a decision onto an agent ([`apply_decision`])
//! - [`archetype`] -- Archetype derivation from Big Five scores
//! - [`config`] -- Population tunables ([`PopulationConfig`])
//! - [`error`] -- Error types ([`PopulationError`])
//! - [`external`] -- Normalizing personas from an external population source
//! - [`population`] -- Trait sampling, grouped distributions, and topology

pub mod agent;
pub mod archetype;
pub mod config;
pub mod error;
pub mod external;
pub mod population;

// Re-export primary types at crate root for convenience.
pub use agent::{apply_decision, clamp_sentiment};
pub use config::PopulationConfig;
pub use error::PopulationError;
pub use external::{ExternalPersona, Ocean, PersonaImporter, complete_personas, parse_personas};
pub use population::{PopulationGenerator, links_of, sample_traits, wire_connections};
