//! Error types for the cohort-agents crate.
//!
//! Population synthesis rejects malformed distribution specs up front
//! rather than producing a partially built population.

/// Errors that can occur while synthesizing or importing a population.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PopulationError {
    /// A population of zero agents was requested.
    #[error("population size must be at least 1")]
    EmptyPopulation,

    /// A group spec carries a share that is negative or not a number.
    #[error("group {index} has invalid share {pct}: must be a finite, non-negative percentage")]
    InvalidGroupShare {
        /// Position of the offending group in the spec.
        index: usize,
        /// The rejected percentage.
        pct: f64,
    },

    /// An external persona payload could not be decoded.
    #[error("invalid external persona payload: {0}")]
    InvalidPersonaPayload(String),
}

impl From<serde_json::Error> for PopulationError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPersonaPayload(err.to_string())
    }
}
