//! Live feed aggregation: one owner, applied one event at a time.
//!
//! The [`LiveStreamAggregator`] turns the feed into graph state for the
//! presentation layer:
//!
//! - **Agents**: `agents_generated` seeds nodes; every `turn` patches the
//!   speaker's node (archetype, confidence, last message and reasoning, a
//!   last-action label from the stance) and appends to its bounded
//!   reasoning history.
//! - **Chain links**: a turn in the same round as the turn immediately
//!   before it links the two speakers. The link is keyed by the unordered
//!   pair and its weight grows by one on every repeat. Nothing links across
//!   a round boundary.
//! - **Tally**: a running support/oppose/undecided count, replaced
//!   wholesale by the `report`'s final beliefs.
//!
//! The aggregator owns all of this state exclusively; nothing else writes
//! to it.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use cohort_agents::archetype;
use cohort_types::{BoundedHistory, Link, Traits, Vote};

use crate::error::StreamError;
use crate::event::{FeedEvent, FinalBelief, ReportEvent, TurnEvent};

/// Default number of reasonings kept per agent.
pub const DEFAULT_REASONING_CAP: usize = 10;

/// What the consumer should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// The report arrived; the feed is done.
    Finished,
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Three-bucket vote count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// In favour.
    pub support: u32,
    /// Against.
    pub oppose: u32,
    /// Everything else.
    pub undecided: u32,
}

impl Tally {
    /// Count one vote.
    pub const fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Support => self.support = self.support.saturating_add(1),
            Vote::Oppose => self.oppose = self.oppose.saturating_add(1),
            Vote::Undecided => self.undecided = self.undecided.saturating_add(1),
        }
    }

    /// Count every final belief from scratch.
    pub fn from_beliefs(beliefs: &[FinalBelief]) -> Self {
        let mut tally = Self::default();
        for belief in beliefs {
            tally.record(Vote::from_belief(&belief.belief));
        }
        tally
    }

    /// Number of votes counted.
    pub const fn total(&self) -> u32 {
        self.support
            .saturating_add(self.oppose)
            .saturating_add(self.undecided)
    }

    /// Integer percentages `(support, oppose, undecided)`.
    ///
    /// Support and oppose round down; undecided takes the remainder so the
    /// three always sum to 100. An empty tally is `(0, 0, 0)`.
    pub fn percentages(&self) -> (u32, u32, u32) {
        let total = u64::from(self.total());
        let pct = |n: u32| {
            u64::from(n)
                .saturating_mul(100)
                .checked_div(total)
                .map_or(0, |p| u32::try_from(p).unwrap_or(100))
        };
        if total == 0 {
            return (0, 0, 0);
        }
        let support = pct(self.support);
        let oppose = pct(self.oppose);
        (support, oppose, 100_u32.saturating_sub(support).saturating_sub(oppose))
    }

    /// `"X% support, Y% oppose, Z% undecided"`.
    pub fn summary(&self) -> String {
        let (support, oppose, undecided) = self.percentages();
        format!("{support}% support, {oppose}% oppose, {undecided}% undecided")
    }
}

// ---------------------------------------------------------------------------
// Live agents
// ---------------------------------------------------------------------------

/// The presentation state of one feed agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveAgent {
    /// Feed-assigned id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Archetype label.
    pub archetype: String,
    /// Normalized traits, when the feed announced the agent.
    pub traits: Option<Traits>,
    /// Occupation.
    pub role: String,
    /// Home location.
    pub culture: String,
    /// Last reported confidence.
    pub confidence: f64,
    /// Last thing the agent said.
    pub last_message: Option<String>,
    /// Reasoning behind the last message.
    pub last_reasoning: Option<String>,
    /// `Support`, `Oppose`, or `Undecided`.
    pub last_action: Option<String>,
    /// Latest vote bucket.
    pub vote: Option<Vote>,
    /// Recent reasonings, oldest first.
    pub reasoning_history: BoundedHistory<String>,
    /// Turns taken.
    pub turns: u32,
}

impl LiveAgent {
    fn placeholder(id: &str, name: &str, reasoning_cap: usize) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            archetype: String::new(),
            traits: None,
            role: String::new(),
            culture: String::new(),
            confidence: 0.0,
            last_message: None,
            last_reasoning: None,
            last_action: None,
            vote: None,
            reasoning_history: BoundedHistory::with_capacity(reasoning_cap),
            turns: 0,
        }
    }
}

/// Serializable view of the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSnapshot {
    /// Whether the feed is still expected to produce events.
    pub running: bool,
    /// Agents, ordered by id.
    pub agents: Vec<LiveAgent>,
    /// Chain links.
    pub links: Vec<Link<String>>,
    /// Current vote counts.
    pub tally: Tally,
    /// Percentage summary line.
    pub summary: String,
    /// Whether the tally came from the final report.
    pub reported: bool,
    /// The synthesized report, once received.
    pub report: Option<serde_json::Value>,
    /// Turns applied so far.
    pub turns: u64,
    /// The error that stopped the feed, if any.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Single-owner state machine over live feed events.
#[derive(Debug)]
pub struct LiveStreamAggregator {
    agents: BTreeMap<String, LiveAgent>,
    edges: BTreeMap<(String, String), f64>,
    tally: Tally,
    reported: bool,
    report: Option<ReportEvent>,
    previous_turn: Option<(u32, String)>,
    reasoning_cap: usize,
    running: bool,
    turns: u64,
    error: Option<String>,
}

impl Default for LiveStreamAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_REASONING_CAP)
    }
}

impl LiveStreamAggregator {
    /// Create an aggregator keeping `reasoning_cap` reasonings per agent.
    pub const fn new(reasoning_cap: usize) -> Self {
        Self {
            agents: BTreeMap::new(),
            edges: BTreeMap::new(),
            tally: Tally {
                support: 0,
                oppose: 0,
                undecided: 0,
            },
            reported: false,
            report: None,
            previous_turn: None,
            reasoning_cap,
            running: true,
            turns: 0,
            error: None,
        }
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Feed`] for an `error` event; the aggregator
    /// is marked not-running and must not be fed further.
    pub fn apply(&mut self, event: FeedEvent) -> Result<Flow, StreamError> {
        match event {
            FeedEvent::AgentsGenerated { count, agents } => {
                self.seed_agents(count, &agents);
                Ok(Flow::Continue)
            }
            FeedEvent::Turn(turn) => {
                self.apply_turn(&turn);
                Ok(Flow::Continue)
            }
            FeedEvent::Report(report) => {
                self.apply_report(report);
                Ok(Flow::Finished)
            }
            FeedEvent::Error { message } => {
                warn!(error = %message, "live feed reported an error");
                self.running = false;
                self.error = Some(message.clone());
                Err(StreamError::Feed { message })
            }
            FeedEvent::Unknown => {
                debug!("ignoring unknown feed event");
                Ok(Flow::Continue)
            }
        }
    }

    /// Mark the feed as ended.
    pub const fn finish(&mut self) {
        self.running = false;
    }

    /// Whether more events are expected.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Current tally.
    pub const fn tally(&self) -> Tally {
        self.tally
    }

    /// Agent by feed id.
    pub fn agent(&self, id: &str) -> Option<&LiveAgent> {
        self.agents.get(id)
    }

    /// Chain links, ordered by endpoint pair.
    pub fn links(&self) -> Vec<Link<String>> {
        self.edges
            .iter()
            .map(|((source, target), weight)| Link {
                source: source.clone(),
                target: target.clone(),
                weight: *weight,
            })
            .collect()
    }

    /// Serializable view of everything aggregated so far.
    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            running: self.running,
            agents: self.agents.values().cloned().collect(),
            links: self.links(),
            tally: self.tally,
            summary: self.tally.summary(),
            reported: self.reported,
            report: self.report.as_ref().map(|r| r.report.clone()),
            turns: self.turns,
            error: self.error.clone(),
        }
    }

    fn seed_agents(&mut self, count: usize, personas: &[cohort_agents::ExternalPersona]) {
        if count != personas.len() {
            debug!(announced = count, received = personas.len(), "agent count mismatch");
        }
        for (index, persona) in personas.iter().enumerate() {
            let id = format!("agent-{}", index.saturating_add(1));
            let traits = persona.ocean.to_traits();
            let mut agent = LiveAgent::placeholder(&id, &persona.name, self.reasoning_cap);
            agent.archetype = archetype::derive(traits).label().to_owned();
            agent.traits = Some(traits);
            agent.role.clone_from(&persona.occupation);
            agent.culture.clone_from(&persona.location);
            self.agents.insert(id, agent);
        }
        info!(agents = personas.len(), "live agents seeded");
    }

    fn apply_turn(&mut self, turn: &TurnEvent) {
        let vote = Vote::from_belief(&turn.stance);
        let cap = self.reasoning_cap;
        let agent = self
            .agents
            .entry(turn.agent_id.clone())
            .or_insert_with(|| LiveAgent::placeholder(&turn.agent_id, &turn.agent_name, cap));
        if !turn.archetype.is_empty() {
            agent.archetype.clone_from(&turn.archetype);
        }
        if agent.name.is_empty() {
            agent.name.clone_from(&turn.agent_name);
        }
        agent.confidence = turn.confidence;
        agent.last_message = Some(turn.message.clone());
        agent.last_reasoning = Some(turn.reasoning.clone());
        agent.last_action = Some(vote.label().to_owned());
        agent.vote = Some(vote);
        agent.reasoning_history.push(turn.reasoning.clone());
        agent.turns = agent.turns.saturating_add(1);

        self.tally.record(vote);
        self.turns = self.turns.saturating_add(1);

        if let Some((round, previous)) = &self.previous_turn
            && *round == turn.round
            && *previous != turn.agent_id
        {
            let key = if *previous < turn.agent_id {
                (previous.clone(), turn.agent_id.clone())
            } else {
                (turn.agent_id.clone(), previous.clone())
            };
            *self.edges.entry(key).or_insert(0.0) += 1.0;
        }
        self.previous_turn = Some((turn.round, turn.agent_id.clone()));
    }

    fn apply_report(&mut self, report: ReportEvent) {
        self.tally = Tally::from_beliefs(&report.final_beliefs);
        for belief in &report.final_beliefs {
            if let Some(agent) = self.agents.get_mut(&belief.agent_id) {
                let vote = Vote::from_belief(&belief.belief);
                agent.vote = Some(vote);
                agent.confidence = belief.confidence;
            }
        }
        info!(
            turns = report.turns_count,
            summary = %self.tally.summary(),
            "live feed report received"
        );
        self.reported = true;
        self.report = Some(report);
        self.running = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::decode_frame;

    fn turn(round: u32, agent: &str, stance: &str) -> FeedEvent {
        FeedEvent::Turn(Box::new(TurnEvent {
            round,
            agent_id: agent.to_owned(),
            agent_name: agent.to_uppercase(),
            message: format!("{agent} speaks"),
            stance: stance.to_owned(),
            reasoning: format!("{agent} reasons"),
            confidence: 0.6,
            archetype: String::from("Community Builder"),
            belief_before: None,
            belief_after: None,
        }))
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let tally = Tally {
            support: 1,
            oppose: 1,
            undecided: 1,
        };
        assert_eq!(tally.percentages(), (33, 33, 34));
        assert_eq!(tally.summary(), "33% support, 33% oppose, 34% undecided");
        assert_eq!(Tally::default().percentages(), (0, 0, 0));
    }

    #[test]
    fn chain_links_stay_within_a_round() {
        let mut agg = LiveStreamAggregator::default();
        for event in [
            turn(1, "a", "support"),
            turn(1, "b", "oppose"),
            turn(2, "c", "support"),
            turn(2, "a", "undecided"),
        ] {
            agg.apply(event).unwrap();
        }
        let pairs: Vec<(String, String)> = agg
            .links()
            .into_iter()
            .map(|l| (l.source, l.target))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (String::from("a"), String::from("b")),
                (String::from("a"), String::from("c")),
            ]
        );
    }

    #[test]
    fn repeated_pairs_gain_weight_in_either_order() {
        let mut agg = LiveStreamAggregator::default();
        for event in [turn(1, "a", "x"), turn(1, "b", "x"), turn(1, "a", "x")] {
            agg.apply(event).unwrap();
        }
        let links = agg.links();
        assert_eq!(links.len(), 1);
        assert!((links.first().unwrap().weight - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_turn_events_do_not_break_the_chain() {
        let mut agg = LiveStreamAggregator::default();
        agg.apply(turn(3, "a", "support")).unwrap();
        agg.apply(decode_frame(r#"{"type":"ping"}"#)).unwrap();
        agg.apply(turn(3, "b", "support")).unwrap();
        assert_eq!(agg.links().len(), 1);
    }

    #[test]
    fn turn_patches_the_agent() {
        let mut agg = LiveStreamAggregator::new(2);
        for _ in 0..3 {
            agg.apply(turn(1, "a", "Oppose")).unwrap();
        }
        let a = agg.agent("a").unwrap();
        assert_eq!(a.last_action.as_deref(), Some("Oppose"));
        assert_eq!(a.vote, Some(Vote::Oppose));
        assert_eq!(a.reasoning_history.len(), 2);
        assert_eq!(a.turns, 3);
        assert_eq!(a.archetype, "Community Builder");
        assert_eq!(agg.tally().oppose, 3);
    }

    #[test]
    fn error_stops_the_aggregator() {
        let mut agg = LiveStreamAggregator::default();
        let err = agg
            .apply(FeedEvent::Error {
                message: String::from("socket closed"),
            })
            .unwrap_err();
        assert_eq!(
            err,
            StreamError::Feed {
                message: String::from("socket closed")
            }
        );
        assert!(!agg.is_running());
        assert_eq!(agg.snapshot().error.as_deref(), Some("socket closed"));
    }

    #[test]
    fn seeded_agents_get_sequential_ids() {
        let mut agg = LiveStreamAggregator::default();
        agg.apply(decode_frame(
            r#"{"type":"agents_generated","count":2,"agents":[{"name":"Ana"},{"name":"Ben","occupation":"nurse"}]}"#,
        ))
        .unwrap();
        assert_eq!(agg.agent("agent-1").unwrap().name, "Ana");
        let ben = agg.agent("agent-2").unwrap();
        assert_eq!(ben.role, "nurse");
        assert!(ben.traits.is_some());
        assert!(!ben.archetype.is_empty());
    }
}
