//! Tick pipeline, scheduling, and experiment orchestration for Cohort.
//!
//! This crate owns the per-tick loop that drives a condition:
//! Select, Decide, Commit, Cluster, Layout, and Measure, plus the control
//! plane (pause, pacing, stop) and the experiment runner that sequences
//! conditions.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `cohort-config.yaml` into
//!   strongly-typed structs.
//! - [`decision`] -- [`DecisionProvider`] trait and [`StubDecisionProvider`].
//! - [`parse`] -- Strict decision payload parsing and the text-backend
//!   adapter.
//! - [`scheduler`] -- Weighted turn selection, concurrent dispatch, and
//!   fallback commit.
//! - [`layout`] -- Force-directed position relaxation.
//! - [`cluster`] -- Sentiment group detection.
//! - [`metrics`] -- Per-tick aggregate metrics.
//! - [`tick`] -- The per-tick pipeline and condition state.
//! - [`operator`] -- Shared pause/stop/pacing state.
//! - [`runner`] -- The condition loop with operator controls.
//! - [`experiment`] -- Sequential multi-condition experiments.
//!
//! [`DecisionProvider`]: decision::DecisionProvider
//! [`StubDecisionProvider`]: decision::StubDecisionProvider

pub mod cluster;
pub mod config;
pub mod decision;
pub mod experiment;
pub mod layout;
pub mod metrics;
pub mod operator;
pub mod parse;
pub mod runner;
pub mod scheduler;
pub mod tick;

pub use config::CohortConfig;
pub use decision::{DecisionError, DecisionProvider, DecisionRequest, StubDecisionProvider};
pub use experiment::{ExperimentError, ExperimentPhase, ExperimentReport, ExperimentRunner};
pub use operator::{OperatorState, OperatorStatus, RunEndReason};
pub use runner::{NoOpCallback, RunOutcome, TickCallback};
pub use tick::{SimulationState, TickError, TickSummary};
