//! End-to-end tests for experiment runs.
//!
//! These drive the full pipeline (population, scheduling, commit, groups,
//! layout, metrics) through [`ExperimentRunner`] with in-process decision
//! providers.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use cohort_core::config::CohortConfig;
use cohort_core::decision::{DecisionError, DecisionProvider, DecisionRequest};
use cohort_core::parse::{CompletionSource, ParsingProvider};
use cohort_core::{
    ExperimentReport, ExperimentRunner, NoOpCallback, OperatorState, RunEndReason,
    SimulationState, TickCallback, TickSummary,
};
use cohort_types::{ConditionResult, Decision, SequentialIds, Stance};

fn config(agents: usize, ticks: u64) -> CohortConfig {
    let mut config = CohortConfig::default();
    config.simulation.agent_count = agents;
    config.simulation.ticks_per_condition = ticks;
    config.simulation.tick_interval_ms = 0;
    config.simulation.settle_interval_ms = 0;
    config.simulation.seed = Some(2024);
    config
}

async fn run<P: DecisionProvider>(
    config: CohortConfig,
    provider: P,
    callback: &mut dyn TickCallback,
) -> ExperimentReport {
    let operator = Arc::new(OperatorState::new(config.simulation.tick_interval_ms));
    let mut runner =
        ExperimentRunner::new(config, provider, Arc::new(SequentialIds::default()), operator)
            .unwrap();
    runner.run(callback).await.unwrap()
}

/// Leans with agreeableness: agreeable agents support, others push back.
struct Temperament;

impl DecisionProvider for Temperament {
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, DecisionError> {
        let lean = (f64::from(request.traits.agreeableness) - 5.5) / 4.5;
        let stance = if lean > 0.0 { Stance::Agree } else { Stance::Disagree };
        Ok(Decision {
            thought: format!("{} weighs the topic", request.name),
            action: String::from("Shared an opinion."),
            sentiment: lean,
            stance,
        })
    }
}

struct Broken;

impl DecisionProvider for Broken {
    async fn decide(&self, _request: DecisionRequest) -> Result<Decision, DecisionError> {
        Err(DecisionError::Provider {
            message: String::from("backend unavailable"),
        })
    }
}

struct Rambling;

impl CompletionSource for Rambling {
    async fn complete(&self, _request: &DecisionRequest) -> Result<String, DecisionError> {
        Ok(String::from("Well, I suppose I would probably agree with that."))
    }
}

struct Sleepy;

impl DecisionProvider for Sleepy {
    async fn decide(&self, _request: DecisionRequest) -> Result<Decision, DecisionError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Decision::neutral_fallback())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start(usize),
    Tick(u64),
    Complete(String),
}

#[derive(Default)]
struct Journal {
    events: Vec<Event>,
}

impl TickCallback for Journal {
    fn on_condition_start(&mut self, index: usize, _state: &SimulationState) {
        self.events.push(Event::Start(index));
    }

    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        // No agent acts twice in one tick.
        let distinct: BTreeSet<_> = summary.selected.iter().collect();
        assert_eq!(distinct.len(), summary.selected.len());

        for agent in &state.agents {
            assert!((-1.0..=1.0).contains(&agent.sentiment));
            assert!((0.05..=0.95).contains(&agent.position.x));
            assert!((0.05..=0.95).contains(&agent.position.y));
        }
        assert!((0.0..=1.0).contains(&summary.point.polarization));
        self.events.push(Event::Tick(summary.tick));
    }

    fn on_condition_complete(&mut self, result: &ConditionResult) {
        self.events.push(Event::Complete(result.condition_name.clone()));
    }
}

fn assert_all_fallbacks(report: &ExperimentReport) {
    for result in &report.results {
        assert!(!result.log.is_empty());
        for entry in &result.log {
            assert!(entry.fallback);
            assert_eq!(entry.action, "Observing.");
            assert_eq!(entry.stance, Stance::Neutral);
        }
        assert_eq!(result.tick_count, 12);
    }
}

#[tokio::test]
async fn two_conditions_run_sequentially() {
    let mut journal = Journal::default();
    let report = run(config(16, 12), Temperament, &mut journal).await;

    assert_eq!(report.end_reason, RunEndReason::Completed);
    assert_eq!(report.results.len(), 2);

    let mut expected = vec![Event::Start(0)];
    expected.extend((1..=12).map(Event::Tick));
    expected.push(Event::Complete(String::from("Uniform Random")));
    expected.push(Event::Start(1));
    expected.extend((1..=12).map(Event::Tick));
    expected.push(Event::Complete(String::from("50/50 Agree Split")));
    assert_eq!(journal.events, expected);

    for result in &report.results {
        assert_eq!(result.agents.len(), 16);
        assert_eq!(result.time_series.len(), 12);
        assert!((0.0..=1.0).contains(&result.cooperation_rate));
        assert!(result.log.iter().all(|e| (1..=12).contains(&e.tick)));
        assert!(result.log.iter().all(|e| !e.fallback));
    }

    // The second population is generated only after the first was captured.
    let first = report.results.first().unwrap();
    let second = report.results.get(1).unwrap();
    let newest_first = first
        .agents
        .iter()
        .map(|a| a.id.into_inner().as_u128())
        .max()
        .unwrap();
    assert!(
        second
            .agents
            .iter()
            .all(|a| a.id.into_inner().as_u128() > newest_first)
    );
    assert!(first.captured_at <= second.captured_at);
}

#[tokio::test]
async fn agree_split_separates_into_two_camps() {
    let report = run(config(16, 12), Temperament, &mut NoOpCallback).await;
    let split = report.results.get(1).unwrap();

    // Half the population has A around 8, the other half around 3, so the
    // committed sentiments cluster on either side of zero.
    let positives = split.agents.iter().filter(|a| a.sentiment > 0.2).count();
    let negatives = split.agents.iter().filter(|a| a.sentiment < -0.2).count();
    let acted = split.agents.iter().filter(|a| !a.stance_history.is_empty()).count();
    assert_eq!(positives + negatives, acted);
}

#[tokio::test]
async fn failing_provider_never_stalls_a_tick() {
    let report = run(config(8, 12), Broken, &mut NoOpCallback).await;
    assert_eq!(report.end_reason, RunEndReason::Completed);
    assert_all_fallbacks(&report);
}

#[tokio::test]
async fn malformed_payloads_fall_back() {
    let report = run(config(8, 12), ParsingProvider::new(Rambling), &mut NoOpCallback).await;
    assert_all_fallbacks(&report);
}

#[tokio::test(start_paused = true)]
async fn timeouts_fall_back() {
    let mut config = config(8, 12);
    config.simulation.decision_timeout_ms = 100;
    let report = run(config, Sleepy, &mut NoOpCallback).await;
    assert_all_fallbacks(&report);
}

#[tokio::test]
async fn seeded_runs_are_reproducible() {
    let a = run(config(10, 6), Temperament, &mut NoOpCallback).await;
    let b = run(config(10, 6), Temperament, &mut NoOpCallback).await;
    for (x, y) in a.results.iter().zip(&b.results) {
        assert_eq!(x.time_series, y.time_series);
        assert_eq!(x.agents, y.agents);
        let xs: Vec<_> = x.log.iter().map(|e| (e.tick, e.agent_id)).collect();
        let ys: Vec<_> = y.log.iter().map(|e| (e.tick, e.agent_id)).collect();
        assert_eq!(xs, ys);
    }
}

/// Requests a stop as soon as the first condition is captured.
struct StopAfterFirst {
    operator: Arc<OperatorState>,
}

impl TickCallback for StopAfterFirst {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}

    fn on_condition_complete(&mut self, _result: &ConditionResult) {
        self.operator.request_stop();
    }
}

#[tokio::test]
async fn stop_keeps_captured_results() {
    let config = config(8, 4);
    let operator = Arc::new(OperatorState::new(0));
    let mut runner = ExperimentRunner::new(
        config,
        Temperament,
        Arc::new(SequentialIds::default()),
        Arc::clone(&operator),
    )
    .unwrap();
    let mut callback = StopAfterFirst {
        operator: Arc::clone(&operator),
    };

    let report = runner.run(&mut callback).await.unwrap();

    assert_eq!(report.end_reason, RunEndReason::OperatorStop);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results.first().unwrap().tick_count, 4);
    assert_eq!(operator.end_reason().await, Some(RunEndReason::OperatorStop));
}
