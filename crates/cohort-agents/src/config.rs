//! Tunables for population synthesis.
//!
//! The engine builds a [`PopulationConfig`] from the `history` section of
//! `cohort-config.yaml`; tests usually take the defaults.

use cohort_types::HistoryCaps;

/// Parameters applied to every synthesized or imported agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationConfig {
    /// Capacities of each agent's rolling histories (default: 50/50/20).
    pub history: HistoryCaps,

    /// Inner radius of the starting ring around the canvas centre (default: 0.2).
    pub ring_radius: f64,

    /// Random extra radius added on top of `ring_radius` (default: 0.2).
    pub ring_spread: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            history: HistoryCaps::default(),
            ring_radius: 0.2,
            ring_spread: 0.2,
        }
    }
}
