//! Condition loop runner with operator controls.
//!
//! This module provides [`run_condition`], which drives the tick loop of a
//! single condition with support for:
//!
//! - **Bounded runs**: stop after exactly `ticks` ticks
//! - **Pause/resume**: the operator can halt and continue between ticks
//! - **Pacing**: a runtime-adjustable sleep after every tick
//! - **Operator stop**: checked before every tick and raced against the
//!   decision join
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it. Sequencing conditions is the experiment
//! runner's job.
//!
//! [`run_tick`]: crate::tick::run_tick

use tracing::info;

use cohort_types::{ConditionResult, IdAllocator};

use crate::decision::DecisionProvider;
use crate::operator::OperatorState;
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// How a condition loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every requested tick ran.
    Completed,
    /// A stop was requested; `tick` is the tick that did not run.
    Cancelled {
        /// The abandoned tick.
        tick: u64,
    },
}

/// Hooks invoked as an experiment progresses.
///
/// Implementations can use this to update the observer snapshot,
/// broadcast tick summaries, etc.
pub trait TickCallback: Send {
    /// Called once a condition's population exists, before its first tick.
    fn on_condition_start(&mut self, _index: usize, _state: &SimulationState) {}

    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);

    /// Called once a condition's result has been captured.
    fn on_condition_complete(&mut self, _result: &ConditionResult) {}
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run ticks until `state.tick` reaches `ticks` or a stop is requested.
///
/// # Arguments
///
/// * `state` - Mutable condition state (population, log, series)
/// * `provider` - Source of agent decisions
/// * `ids` - Allocator for log entry ids
/// * `operator` - Shared operator control state
/// * `ticks` - Number of ticks the condition runs for
/// * `callback` - Called after each tick for observer updates
pub async fn run_condition<P: DecisionProvider>(
    state: &mut SimulationState,
    provider: &P,
    ids: &dyn IdAllocator,
    operator: &OperatorState,
    ticks: u64,
    callback: &mut dyn TickCallback,
) -> RunOutcome {
    info!(
        condition = %state.condition_name,
        agents = state.agents.len(),
        ticks,
        tick_interval_ms = operator.tick_interval_ms(),
        "Condition starting"
    );

    while state.tick < ticks {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Run paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Run resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!(tick = state.tick, "Operator stop requested");
            return RunOutcome::Cancelled {
                tick: state.tick.saturating_add(1),
            };
        }

        // --- Execute tick ---
        match tick::run_tick(state, provider, ids, operator).await {
            Ok(summary) => callback.on_tick(&summary, state),
            Err(TickError::Cancelled { tick }) => {
                info!(tick, "Tick abandoned on operator stop");
                return RunOutcome::Cancelled { tick };
            }
        }

        // --- Sleep for tick interval ---
        if state.tick < ticks {
            operator.pace(operator.tick_interval_ms()).await;
        }
    }

    info!(condition = %state.condition_name, ticks = state.tick, "Condition complete");
    RunOutcome::Completed
}
