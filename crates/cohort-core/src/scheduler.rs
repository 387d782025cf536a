//! Turn scheduling: Idle -> Selecting -> Dispatching -> Committing -> Idle.
//!
//! Each tick the [`TurnScheduler`]
//!
//! 1. **Selects** a subset of `k` agents by weighted sampling without
//!    replacement. `k` is drawn uniformly from `[min_selected,
//!    max_selected]` every tick and clamped to the population size. An
//!    agent's weight is `E / 10 * 0.5 + 0.5`, plus `0.2` when its
//!    neuroticism is above seven.
//! 2. **Dispatches** one provider call per selected agent. Calls run
//!    concurrently, each under its own timeout, and are all joined before
//!    anything is committed. The join is raced against the operator's stop
//!    signal; a stop abandons the in-flight calls.
//! 3. **Commits** results in selection order. A failed call (timeout,
//!    backend error, malformed payload) is replaced by the neutral fallback
//!    decision, so a tick never stalls because one agent's call failed.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use tracing::{debug, warn};

use cohort_agents::apply_decision;
use cohort_types::{Agent, AgentId, Decision, IdAllocator, LogEntry, LogEntryId, Traits};

use crate::decision::{DecisionError, DecisionProvider, DecisionRequest};
use crate::operator::OperatorState;

/// Scheduler phases, exposed for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Between ticks.
    Idle,
    /// Drawing the tick's subset.
    Selecting,
    /// Waiting on provider calls.
    Dispatching,
    /// Writing decisions to agents.
    Committing,
}

/// The outcome of one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    /// Index of the agent in the population.
    pub agent_index: usize,
    /// The provider's answer.
    pub result: Result<Decision, DecisionError>,
}

/// The join was abandoned because a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

/// Weighted subset selection, concurrent dispatch, and fallback commit.
#[derive(Debug, Clone)]
pub struct TurnScheduler {
    min_selected: usize,
    max_selected: usize,
    decision_timeout: Duration,
    phase: SchedulerPhase,
}

impl TurnScheduler {
    /// Create a scheduler choosing between `min_selected` and
    /// `max_selected` agents per tick.
    pub const fn new(min_selected: usize, max_selected: usize, decision_timeout: Duration) -> Self {
        Self {
            min_selected,
            max_selected,
            decision_timeout,
            phase: SchedulerPhase::Idle,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Per-call timeout.
    pub const fn decision_timeout(&self) -> Duration {
        self.decision_timeout
    }

    /// Draw this tick's subset size.
    pub fn subset_size(&self, population: usize, rng: &mut impl Rng) -> usize {
        let lo = self.min_selected.min(self.max_selected);
        let hi = self.max_selected.max(lo);
        rng.random_range(lo..=hi).min(population)
    }

    /// Select this tick's agents, returning their population indices.
    ///
    /// No index appears twice.
    pub fn select(&mut self, agents: &[Agent], rng: &mut impl Rng) -> Vec<usize> {
        self.phase = SchedulerPhase::Selecting;
        let k = self.subset_size(agents.len(), rng);
        weighted_sample(agents, k, rng)
    }

    /// Issue one provider call per request and join them all.
    ///
    /// Returns [`Abandoned`] if a stop is requested before every call has
    /// finished or timed out.
    pub async fn dispatch<P: DecisionProvider>(
        &mut self,
        provider: &P,
        requests: Vec<(usize, DecisionRequest)>,
        operator: &OperatorState,
    ) -> Result<Vec<DecisionOutcome>, Abandoned> {
        self.phase = SchedulerPhase::Dispatching;
        if operator.is_stop_requested() {
            self.phase = SchedulerPhase::Idle;
            return Err(Abandoned);
        }

        let timeout = self.decision_timeout;
        let deadline_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let calls = requests.into_iter().map(|(agent_index, request)| {
            let agent_id = request.agent_id;
            async move {
                let result = match tokio::time::timeout(timeout, provider.decide(request)).await {
                    Ok(answer) => answer,
                    Err(_elapsed) => Err(DecisionError::Timeout {
                        agent_id,
                        deadline_ms,
                    }),
                };
                DecisionOutcome {
                    agent_index,
                    result,
                }
            }
        });

        tokio::select! {
            biased;
            () = operator.stopped() => {
                self.phase = SchedulerPhase::Idle;
                Err(Abandoned)
            }
            outcomes = join_all(calls) => Ok(outcomes),
        }
    }

    /// Commit joined outcomes onto the agents and append log entries.
    ///
    /// Returns the number of fallback decisions substituted.
    pub fn commit(
        &mut self,
        agents: &mut [Agent],
        outcomes: Vec<DecisionOutcome>,
        tick: u64,
        ids: &dyn IdAllocator,
        log: &mut Vec<LogEntry>,
    ) -> u32 {
        self.phase = SchedulerPhase::Committing;
        let mut fallbacks: u32 = 0;
        for outcome in outcomes {
            let Some(agent) = agents.get_mut(outcome.agent_index) else {
                continue;
            };
            let (decision, fallback) = match outcome.result {
                Ok(decision) => (decision, false),
                Err(err) => {
                    warn!(tick, agent = %agent.name, error = %err, "decision failed, committing fallback");
                    fallbacks = fallbacks.saturating_add(1);
                    (Decision::neutral_fallback(), true)
                }
            };
            let sentiment = apply_decision(agent, &decision);
            debug!(tick, agent = %agent.name, stance = %decision.stance, sentiment, "decision committed");
            log.push(LogEntry {
                id: LogEntryId::allocate(ids),
                tick,
                agent_id: agent.id,
                agent_name: agent.name.clone(),
                action: decision.action,
                thought: decision.thought,
                sentiment,
                stance: decision.stance,
                fallback,
                recorded_at: Utc::now(),
            });
        }
        self.phase = SchedulerPhase::Idle;
        fallbacks
    }
}

/// Selection weight: extraverts speak up more, and anxious agents (N > 7)
/// get a fixed bump on top.
pub fn selection_weight(traits: Traits) -> f64 {
    let restless = if traits.neuroticism > 7 { 0.2 } else { 0.0 };
    (f64::from(traits.extraversion) / 10.0).mul_add(0.5, 0.5) + restless
}

/// Draw `k` distinct indices, each with probability proportional to its
/// weight among those not yet drawn.
///
/// Each draw scales a uniform value to the pool's total weight and walks
/// the cumulative weights to find the hit, then removes the hit from the
/// pool.
pub fn weighted_sample(agents: &[Agent], k: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut pool: Vec<(usize, f64)> = agents
        .iter()
        .enumerate()
        .map(|(i, a)| (i, selection_weight(a.traits)))
        .collect();

    let mut selected = Vec::with_capacity(k);
    for _ in 0..k {
        if pool.is_empty() {
            break;
        }
        let total: f64 = pool.iter().map(|(_, w)| w).sum();
        let mut remaining = rng.random::<f64>() * total;
        // Rounding can leave a sliver past the last weight; it lands on the last entry.
        let mut hit = pool.len().saturating_sub(1);
        for (pos, (_, weight)) in pool.iter().enumerate() {
            remaining -= weight;
            if remaining <= 0.0 {
                hit = pos;
                break;
            }
        }
        let (index, _) = pool.remove(hit);
        selected.push(index);
    }
    selected
}

/// The ids of the selected agents, in selection order.
pub fn selected_ids(agents: &[Agent], selection: &[usize]) -> Vec<AgentId> {
    selection
        .iter()
        .filter_map(|&i| agents.get(i).map(|a| a.id))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use cohort_agents::{PopulationConfig, PopulationGenerator};
    use cohort_types::{DistributionSpec, SequentialIds, Stance};

    use super::*;
    use crate::decision::StubDecisionProvider;
    use crate::parse::ParseError;

    fn population(n: usize, ids: &SequentialIds) -> Vec<Agent> {
        let generator = PopulationGenerator::new(PopulationConfig::default(), ids);
        let mut rng = SmallRng::seed_from_u64(17);
        generator
            .generate(n, &DistributionSpec::Uniform, &mut rng)
            .unwrap()
    }

    fn requests(agents: &[Agent], selection: &[usize]) -> Vec<(usize, DecisionRequest)> {
        selection
            .iter()
            .map(|&i| (i, DecisionRequest::for_agent(agents.get(i).unwrap(), 1, &[], "topic")))
            .collect()
    }

    #[test]
    fn weights_follow_extraversion_and_neuroticism() {
        assert!((selection_weight(Traits::clamped(5, 5, 10, 5, 5)) - 1.0).abs() < 1e-12);
        assert!((selection_weight(Traits::clamped(5, 5, 1, 5, 5)) - 0.55).abs() < 1e-12);
        assert!((selection_weight(Traits::clamped(5, 5, 10, 5, 8)) - 1.2).abs() < 1e-12);
        assert!((selection_weight(Traits::clamped(5, 5, 10, 5, 7)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn anxious_agents_are_picked_more_often_at_equal_extraversion() {
        let ids = SequentialIds::default();
        let mut agents = population(2, &ids);
        agents.get_mut(0).unwrap().traits = Traits::clamped(5, 5, 10, 5, 10);
        agents.get_mut(1).unwrap().traits = Traits::clamped(5, 5, 10, 5, 1);

        let mut rng = SmallRng::seed_from_u64(41);
        let anxious_picks = (0..20_000)
            .filter(|_| weighted_sample(&agents, 1, &mut rng).first() == Some(&0))
            .count();
        // Expected share is 1.2 / 2.2, about 54.5%; an even split would be 10,000.
        assert!(
            (10_500..=11_300).contains(&anxious_picks),
            "picked {anxious_picks}"
        );
    }

    #[test]
    fn never_selects_the_same_agent_twice() {
        let ids = SequentialIds::default();
        let agents = population(6, &ids);
        let mut rng = SmallRng::seed_from_u64(3);
        for k in 0..=6 {
            for _ in 0..50 {
                let picks = weighted_sample(&agents, k, &mut rng);
                assert_eq!(picks.len(), k);
                let distinct: BTreeSet<usize> = picks.iter().copied().collect();
                assert_eq!(distinct.len(), k);
            }
        }
    }

    #[test]
    fn subset_size_within_bounds_and_clamped() {
        let scheduler = TurnScheduler::new(2, 4, Duration::from_secs(1));
        let mut rng = SmallRng::seed_from_u64(8);
        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            let k = scheduler.subset_size(16, &mut rng);
            assert!((2..=4).contains(&k));
            seen.insert(k);
            assert!(scheduler.subset_size(3, &mut rng) <= 3);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn extraverts_are_picked_more_often() {
        let ids = SequentialIds::default();
        let mut agents = population(2, &ids);
        agents.get_mut(0).unwrap().traits = Traits::clamped(5, 5, 10, 5, 5);
        agents.get_mut(1).unwrap().traits = Traits::clamped(5, 5, 1, 5, 5);
        let mut rng = SmallRng::seed_from_u64(21);
        let first_picks = (0..2000)
            .filter(|_| weighted_sample(&agents, 1, &mut rng).first() == Some(&0))
            .count();
        // Expected share is 1.0 / 1.55, about 65%.
        assert!(first_picks > 1150, "picked {first_picks}");
    }

    struct Failing;

    impl DecisionProvider for Failing {
        async fn decide(&self, _request: DecisionRequest) -> Result<Decision, DecisionError> {
            Err(DecisionError::Parse {
                source: ParseError::MissingField("stance"),
            })
        }
    }

    struct Slow;

    impl DecisionProvider for Slow {
        async fn decide(&self, _request: DecisionRequest) -> Result<Decision, DecisionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Decision::neutral_fallback())
        }
    }

    #[tokio::test]
    async fn failures_commit_a_valid_fallback() {
        let ids = SequentialIds::default();
        let mut agents = population(5, &ids);
        let mut scheduler = TurnScheduler::new(2, 2, Duration::from_secs(1));
        let operator = OperatorState::new(0);
        let selection = vec![0, 3];

        let outcomes = scheduler
            .dispatch(&Failing, requests(&agents, &selection), &operator)
            .await
            .unwrap();
        let mut log = Vec::new();
        let fallbacks = scheduler.commit(&mut agents, outcomes, 1, &ids, &mut log);

        assert_eq!(fallbacks, 2);
        assert_eq!(log.len(), 2);
        for entry in &log {
            assert!(entry.fallback);
            assert_eq!(entry.stance, Stance::Neutral);
            assert!((-1.0..=1.0).contains(&entry.sentiment));
        }
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_are_treated_as_failures() {
        let ids = SequentialIds::default();
        let mut agents = population(3, &ids);
        let mut scheduler = TurnScheduler::new(1, 1, Duration::from_millis(50));
        let operator = OperatorState::new(0);

        let outcomes = scheduler
            .dispatch(&Slow, requests(&agents, &[1]), &operator)
            .await
            .unwrap();
        assert!(matches!(
            outcomes.first().map(|o| &o.result),
            Some(Err(DecisionError::Timeout { deadline_ms: 50, .. }))
        ));

        let mut log = Vec::new();
        scheduler.commit(&mut agents, outcomes, 1, &ids, &mut log);
        assert_eq!(agents.get(1).unwrap().last_action.as_deref(), Some("Observing."));
    }

    #[tokio::test]
    async fn stop_abandons_dispatch() {
        let ids = SequentialIds::default();
        let agents = population(3, &ids);
        let mut scheduler = TurnScheduler::new(1, 1, Duration::from_secs(1));
        let operator = OperatorState::new(0);
        operator.request_stop();

        let result = scheduler
            .dispatch(&StubDecisionProvider::default(), requests(&agents, &[0]), &operator)
            .await;
        assert_eq!(result, Err(Abandoned));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_join_abandons_in_flight_calls() {
        let ids = SequentialIds::default();
        let agents = population(3, &ids);
        let mut scheduler = TurnScheduler::new(1, 1, Duration::from_secs(600));
        let operator = std::sync::Arc::new(OperatorState::new(0));

        let stopper = {
            let operator = std::sync::Arc::clone(&operator);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                operator.request_stop();
            })
        };
        let result = scheduler
            .dispatch(&Slow, requests(&agents, &[0, 2]), &operator)
            .await;
        assert_eq!(result, Err(Abandoned));
        stopper.await.unwrap();
    }

    #[tokio::test]
    async fn commit_preserves_selection_order() {
        let ids = SequentialIds::default();
        let mut agents = population(6, &ids);
        let mut scheduler = TurnScheduler::new(3, 3, Duration::from_secs(1));
        let operator = OperatorState::new(0);
        let selection = vec![4, 1, 5];
        let provider = StubDecisionProvider::new(Decision {
            thought: String::from("yes"),
            action: String::from("Cheered."),
            sentiment: 0.8,
            stance: Stance::Cooperate,
        });

        let outcomes = scheduler
            .dispatch(&provider, requests(&agents, &selection), &operator)
            .await
            .unwrap();
        let mut log = Vec::new();
        scheduler.commit(&mut agents, outcomes, 1, &ids, &mut log);

        let logged: Vec<AgentId> = log.iter().map(|e| e.agent_id).collect();
        assert_eq!(logged, selected_ids(&agents, &selection));
        assert!((agents.get(4).unwrap().sentiment - 0.8).abs() < f64::EPSILON);
    }
}
