//! Tick pipeline: the per-tick loop body that drives one condition.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Select** -- the [`TurnScheduler`] draws this tick's agents.
//! 2. **Decide** -- one [`DecisionRequest`] per selected agent is sent to the
//!    [`DecisionProvider`]; all calls are joined before anything changes.
//! 3. **Commit** -- decisions (or neutral fallbacks) are written to agents
//!    and the interaction log.
//! 4. **Cluster** -- sentiment groups are recomputed from the committed
//!    sentiments.
//! 5. **Layout** -- one relaxation step, using this tick's groups for
//!    cohesion.
//! 6. **Measure** -- one [`TimeSeriesPoint`] is appended.
//!
//! No tick starts before the previous one has finished all six phases. A
//! stop request observed before or during phase 2 abandons the tick with
//! [`TickError::Cancelled`]; nothing is committed for it.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use tracing::{debug, info};

use cohort_types::{
    Agent, AgentId, ConditionId, ConditionResult, Group, IdAllocator, Link, LogEntry,
    TimeSeriesPoint,
};

use crate::cluster::detect_groups;
use crate::config::{CohortConfig, LayoutConfig};
use crate::decision::{DecisionProvider, DecisionRequest};
use crate::layout::layout_step;
use crate::metrics;
use crate::operator::OperatorState;
use crate::scheduler::{self, Abandoned, TurnScheduler};

/// Errors that can occur during tick execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// A stop was requested before the tick could commit.
    #[error("tick {tick} cancelled by operator")]
    Cancelled {
        /// The tick that was abandoned.
        tick: u64,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed (1-based).
    pub tick: u64,
    /// Agents selected this tick, in selection order.
    pub selected: Vec<AgentId>,
    /// How many selected agents received the neutral fallback.
    pub fallbacks: u32,
    /// The metrics recorded for this tick.
    pub point: TimeSeriesPoint,
}

/// The mutable state of one condition run.
///
/// Created fresh for every condition, so nothing derived from a previous
/// condition (log, time series, groups) can leak into the next.
#[derive(Debug)]
pub struct SimulationState {
    /// Identifier of this condition run.
    pub condition_id: ConditionId,
    /// Condition name.
    pub condition_name: String,
    /// The last completed tick (0 before the first tick).
    pub tick: u64,
    /// The population.
    pub agents: Vec<Agent>,
    /// Edges derived from the agents' connections.
    pub links: Vec<Link<AgentId>>,
    /// Groups detected on the last tick.
    pub groups: Vec<Group>,
    /// Every committed decision, in commit order.
    pub log: Vec<LogEntry>,
    /// One point per completed tick.
    pub time_series: Vec<TimeSeriesPoint>,
    /// Free-text stimulus sent with every request.
    pub context: String,
    /// Number of global log entries forwarded to each request.
    pub recent_action_window: usize,
    /// Layout force constants.
    pub layout: LayoutConfig,
    /// Subset selection and dispatch.
    pub scheduler: TurnScheduler,
    /// Randomness for selection.
    pub rng: StdRng,
}

impl SimulationState {
    /// Start a condition run over a freshly generated population.
    pub fn new(
        condition_id: ConditionId,
        condition_name: String,
        agents: Vec<Agent>,
        config: &CohortConfig,
        rng: StdRng,
    ) -> Self {
        let sim = &config.simulation;
        let links = cohort_agents::links_of(&agents);
        Self {
            condition_id,
            condition_name,
            tick: 0,
            agents,
            links,
            groups: Vec::new(),
            log: Vec::new(),
            time_series: Vec::new(),
            context: sim.context.clone(),
            recent_action_window: sim.recent_action_window,
            layout: config.layout,
            scheduler: TurnScheduler::new(
                sim.min_selected,
                sim.max_selected,
                Duration::from_millis(sim.decision_timeout_ms),
            ),
            rng,
        }
    }

    /// The tail of the interaction log forwarded to providers.
    pub fn recent_actions(&self) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(self.recent_action_window);
        self.log.get(start..).unwrap_or(&[])
    }

    /// Freeze this run into its result.
    pub fn into_result(self) -> ConditionResult {
        ConditionResult {
            condition_id: self.condition_id,
            condition_name: self.condition_name,
            avg_sentiment: metrics::avg_sentiment(&self.agents),
            polarization: metrics::polarization(&self.agents),
            cooperation_rate: metrics::cooperation_rate(&self.agents),
            group_count: metrics::group_count(&self.groups),
            tick_count: self.tick,
            agents: self.agents,
            log: self.log,
            time_series: self.time_series,
            captured_at: Utc::now(),
        }
    }
}

/// Execute one tick.
///
/// # Errors
///
/// Returns [`TickError::Cancelled`] if a stop is requested before the
/// decisions are joined. Agents, log, and series are left untouched in
/// that case.
pub async fn run_tick<P: DecisionProvider>(
    state: &mut SimulationState,
    provider: &P,
    ids: &dyn IdAllocator,
    operator: &OperatorState,
) -> Result<TickSummary, TickError> {
    let tick = state.tick.saturating_add(1);
    if operator.is_stop_requested() {
        return Err(TickError::Cancelled { tick });
    }

    // --- Phase 1: Select ---
    let selection = state.scheduler.select(&state.agents, &mut state.rng);
    let selected = scheduler::selected_ids(&state.agents, &selection);
    debug!(tick, selected = selection.len(), "Agents selected");

    // --- Phase 2: Decide ---
    let requests: Vec<(usize, DecisionRequest)> = {
        let recent = state.recent_actions();
        selection
            .iter()
            .filter_map(|&i| {
                state
                    .agents
                    .get(i)
                    .map(|agent| (i, DecisionRequest::for_agent(agent, tick, recent, &state.context)))
            })
            .collect()
    };
    let outcomes = state
        .scheduler
        .dispatch(provider, requests, operator)
        .await
        .map_err(|Abandoned| TickError::Cancelled { tick })?;

    // --- Phase 3: Commit ---
    let fallbacks = state
        .scheduler
        .commit(&mut state.agents, outcomes, tick, ids, &mut state.log);

    // --- Phase 4: Cluster ---
    state.groups = detect_groups(&state.agents);

    // --- Phase 5: Layout ---
    layout_step(&mut state.agents, &state.groups, &state.layout);

    // --- Phase 6: Measure ---
    let point = metrics::measure(tick, &state.agents, &state.groups);
    state.time_series.push(point);
    state.tick = tick;

    info!(
        condition = %state.condition_name,
        tick,
        avg_sentiment = point.avg_sentiment,
        polarization = point.polarization,
        groups = point.group_count,
        fallbacks,
        "Tick complete"
    );

    Ok(TickSummary {
        tick,
        selected,
        fallbacks,
        point,
    })
}
