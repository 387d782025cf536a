//! Shared type definitions for the Cohort simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Cohort workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers and the injectable id allocator
//! - [`enums`] -- Trait dimensions, stances, vote buckets, groups, archetypes
//! - [`history`] -- Fixed-capacity rolling history buffer
//! - [`structs`] -- Agents, links, groups, metrics, decisions, conditions

pub mod enums;
pub mod history;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Archetype, GroupKind, Stance, TraitKind, UnknownStance, Vote};
pub use history::BoundedHistory;
pub use ids::{AgentId, ConditionId, ExperimentId, IdAllocator, LogEntryId, SequentialIds, UuidV7Ids};
pub use structs::{
    Agent, Condition, ConditionResult, Decision, DistributionSpec, Group, GroupSpec, HistoryCaps,
    Link, LogEntry, TimeSeriesPoint, TraitBias, Traits, Vec2, TRAIT_MAX, TRAIT_MIN,
};
