//! Experiment orchestration: Idle -> RunningCondition(i) -> Settling -> ... -> Done.
//!
//! An experiment is an ordered list of conditions run against the same tick
//! budget. For every condition the runner
//!
//! 1. regenerates the population from the condition's distribution (or
//!    from imported personas),
//! 2. starts a fresh [`SimulationState`] so no log, series, or groups
//!    carry over,
//! 3. runs exactly `ticks_per_condition` ticks, and
//! 4. captures an immutable [`ConditionResult`].
//!
//! Conditions run strictly one after another: the next population is not
//! generated until the previous result has been captured. Configuration
//! is validated when the runner is built, before any state exists.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::info;

use cohort_agents::{ExternalPersona, PersonaImporter, PopulationError, PopulationGenerator};
use cohort_types::{Agent, Condition, ConditionId, ConditionResult, ExperimentId, IdAllocator};

use crate::config::CohortConfig;
use crate::decision::DecisionProvider;
use crate::operator::{OperatorState, RunEndReason};
use crate::runner::{self, RunOutcome, TickCallback};
use crate::tick::SimulationState;

/// Error type for experiment operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExperimentError {
    /// The configuration cannot produce a meaningful run.
    #[error("invalid experiment configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// A population could not be generated.
    #[error("population error: {source}")]
    Population {
        /// The underlying population error.
        #[from]
        source: PopulationError,
    },
}

/// Where the experiment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExperimentPhase {
    /// Built but not started.
    Idle,
    /// Running the condition at this index.
    RunningCondition(usize),
    /// Pausing between two conditions.
    Settling,
    /// Finished, either completed or stopped.
    Done,
}

/// Everything an experiment produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    /// Identifier of this experiment.
    pub experiment_id: ExperimentId,
    /// One result per condition that ran to completion, in order.
    pub results: Vec<ConditionResult>,
    /// Why the experiment ended.
    pub end_reason: RunEndReason,
}

/// Check that a configuration can be run.
///
/// # Errors
///
/// Returns [`ExperimentError::InvalidConfig`] naming the first problem.
pub fn validate(config: &CohortConfig) -> Result<(), ExperimentError> {
    let sim = &config.simulation;
    let invalid = |reason: &str| ExperimentError::InvalidConfig {
        reason: reason.to_owned(),
    };
    if sim.agent_count == 0 {
        return Err(invalid("agent_count must be at least 1"));
    }
    if sim.ticks_per_condition == 0 {
        return Err(invalid("ticks_per_condition must be at least 1"));
    }
    if config.conditions.is_empty() {
        return Err(invalid("at least one condition is required"));
    }
    if sim.min_selected == 0 || sim.min_selected > sim.max_selected {
        return Err(invalid("selection bounds must satisfy 1 <= min_selected <= max_selected"));
    }
    for condition in &config.conditions {
        cohort_agents::population::validate_spec(&condition.distribution).map_err(|err| {
            ExperimentError::InvalidConfig {
                reason: format!("condition `{}`: {err}", condition.name),
            }
        })?;
    }
    Ok(())
}

/// Runs every configured condition in order.
pub struct ExperimentRunner<P> {
    config: CohortConfig,
    provider: P,
    ids: Arc<dyn IdAllocator>,
    operator: Arc<OperatorState>,
    rng: StdRng,
    personas: Option<Vec<ExternalPersona>>,
    experiment_id: ExperimentId,
    phase: ExperimentPhase,
}

impl<P: DecisionProvider> ExperimentRunner<P> {
    /// Build a runner, rejecting unrunnable configurations up front.
    ///
    /// The RNG is seeded from `simulation.seed` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ExperimentError::InvalidConfig`] if [`validate`] fails.
    pub fn new(
        config: CohortConfig,
        provider: P,
        ids: Arc<dyn IdAllocator>,
        operator: Arc<OperatorState>,
    ) -> Result<Self, ExperimentError> {
        validate(&config)?;
        let rng = config
            .simulation
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let experiment_id = ExperimentId::allocate(ids.as_ref());
        Ok(Self {
            config,
            provider,
            ids,
            operator,
            rng,
            personas: None,
            experiment_id,
            phase: ExperimentPhase::Idle,
        })
    }

    /// Populate every condition from these personas instead of synthesizing.
    ///
    /// Missing personas are padded with fallbacks; each condition's
    /// distribution is ignored.
    #[must_use]
    pub fn with_personas(mut self, personas: Vec<ExternalPersona>) -> Self {
        self.personas = Some(personas);
        self
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> ExperimentPhase {
        self.phase
    }

    /// This experiment's identifier.
    pub const fn experiment_id(&self) -> ExperimentId {
        self.experiment_id
    }

    /// Run every condition in order.
    ///
    /// A stop request ends the experiment early; results captured before
    /// the stop are returned intact and the condition in progress is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ExperimentError::Population`] if a population cannot be
    /// built.
    pub async fn run(
        &mut self,
        callback: &mut dyn TickCallback,
    ) -> Result<ExperimentReport, ExperimentError> {
        let ticks = self.config.simulation.ticks_per_condition;
        let conditions = self.config.conditions.clone();
        let mut results = Vec::with_capacity(conditions.len());

        info!(
            experiment = %self.experiment_id,
            conditions = conditions.len(),
            ticks,
            agents = self.config.simulation.agent_count,
            "Experiment starting"
        );

        for (index, condition) in conditions.iter().enumerate() {
            if self.operator.is_stop_requested() {
                return Ok(self.finish(results, RunEndReason::OperatorStop).await);
            }
            self.phase = ExperimentPhase::RunningCondition(index);

            let mut rng = StdRng::from_rng(&mut self.rng);
            let agents = self.populate(condition, &mut rng)?;
            let mut state = SimulationState::new(
                ConditionId::allocate(self.ids.as_ref()),
                condition.name.clone(),
                agents,
                &self.config,
                rng,
            );
            callback.on_condition_start(index, &state);

            let outcome = runner::run_condition(
                &mut state,
                &self.provider,
                self.ids.as_ref(),
                &self.operator,
                ticks,
                callback,
            )
            .await;
            if let RunOutcome::Cancelled { tick } = outcome {
                info!(condition = %condition.name, tick, "Condition discarded on operator stop");
                return Ok(self.finish(results, RunEndReason::OperatorStop).await);
            }

            let result = state.into_result();
            info!(
                condition = %result.condition_name,
                avg_sentiment = result.avg_sentiment,
                polarization = result.polarization,
                cooperation_rate = result.cooperation_rate,
                groups = result.group_count,
                log_entries = result.log.len(),
                "Condition result captured"
            );
            callback.on_condition_complete(&result);
            results.push(result);

            if index.saturating_add(1) < conditions.len() {
                self.phase = ExperimentPhase::Settling;
                self.operator
                    .pace(self.config.simulation.settle_interval_ms)
                    .await;
            }
        }

        Ok(self.finish(results, RunEndReason::Completed).await)
    }

    fn populate(
        &self,
        condition: &Condition,
        rng: &mut StdRng,
    ) -> Result<Vec<Agent>, ExperimentError> {
        let count = self.config.simulation.agent_count;
        let population = self.config.population();
        let agents = match &self.personas {
            Some(personas) => PersonaImporter::new(population, self.ids.as_ref())
                .import(personas.clone(), count, rng)?,
            None => PopulationGenerator::new(population, self.ids.as_ref()).generate(
                count,
                &condition.distribution,
                rng,
            )?,
        };
        Ok(agents)
    }

    async fn finish(
        &mut self,
        results: Vec<ConditionResult>,
        end_reason: RunEndReason,
    ) -> ExperimentReport {
        self.phase = ExperimentPhase::Done;
        self.operator.set_end_reason(end_reason).await;
        info!(
            experiment = %self.experiment_id,
            reason = ?end_reason,
            conditions_completed = results.len(),
            "Experiment ended"
        );
        ExperimentReport {
            experiment_id: self.experiment_id,
            results,
            end_reason,
        }
    }
}
