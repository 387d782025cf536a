//! Decision provider contract and stub implementation.
//!
//! Each tick the turn scheduler presents every selected agent with a
//! [`DecisionRequest`] and awaits a [`Decision`] in response. The
//! [`DecisionProvider`] trait abstracts the mechanism by which decisions
//! are obtained -- a language model behind a
//! [`ParsingProvider`](crate::parse::ParsingProvider), a scripted
//! heuristic, or a test stub.
//!
//! A provider either returns a fully validated decision or fails. It
//! never hands back a malformed record; substituting a default on failure
//! is the scheduler's job, not the provider's.

use std::future::Future;

use serde::{Deserialize, Serialize};

use cohort_types::{Agent, AgentId, Archetype, Decision, LogEntry, Stance, Traits};

/// Memories and sentiments forwarded to the provider per agent.
pub const PERSONA_MEMORY_WINDOW: usize = 5;

/// Errors a decision provider can report for one call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    /// The provider did not answer within the deadline.
    #[error("agent {agent_id} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent whose call timed out.
        agent_id: AgentId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// The backend itself failed (transport, quota, ...).
    #[error("decision provider error: {message}")]
    Provider {
        /// Description of the failure.
        message: String,
    },

    /// The backend answered but the payload did not validate.
    #[error("malformed decision payload: {source}")]
    Parse {
        /// The underlying parse error.
        #[from]
        source: crate::parse::ParseError,
    },
}

/// One recent action from the global interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentAction {
    /// Who acted.
    pub agent_name: String,
    /// What they did.
    pub action: String,
    /// Their sentiment afterwards.
    pub sentiment: f64,
    /// The stance they took.
    pub stance: Stance,
}

impl From<&LogEntry> for RecentAction {
    fn from(entry: &LogEntry) -> Self {
        Self {
            agent_name: entry.agent_name.clone(),
            action: entry.action.clone(),
            sentiment: entry.sentiment,
            stance: entry.stance,
        }
    }
}

/// Everything a provider may see when deciding for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// The tick being decided.
    pub tick: u64,
    /// The deciding agent.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Social role.
    pub role: String,
    /// Cultural background.
    pub culture: String,
    /// Derived archetype.
    pub archetype: Archetype,
    /// Big Five scores.
    pub traits: Traits,
    /// Current sentiment.
    pub sentiment: f64,
    /// Most recent sentiments, oldest first.
    pub recent_sentiments: Vec<f64>,
    /// Most recent memories, oldest first.
    pub memories: Vec<String>,
    /// Most recent global actions, oldest first.
    pub recent_actions: Vec<RecentAction>,
    /// Free-text stimulus and round marker.
    pub context: String,
}

impl DecisionRequest {
    /// Snapshot an agent and the tail of the global log into a request.
    pub fn for_agent(agent: &Agent, tick: u64, recent: &[LogEntry], stimulus: &str) -> Self {
        Self {
            tick,
            agent_id: agent.id,
            name: agent.name.clone(),
            role: agent.role.clone(),
            culture: agent.culture.clone(),
            archetype: agent.archetype,
            traits: agent.traits,
            sentiment: agent.sentiment,
            recent_sentiments: agent.sentiment_history.recent(PERSONA_MEMORY_WINDOW).to_vec(),
            memories: agent.memory.recent(PERSONA_MEMORY_WINDOW).to_vec(),
            recent_actions: recent.iter().map(RecentAction::from).collect(),
            context: round_context(stimulus, tick),
        }
    }
}

/// The context line sent with every request.
pub fn round_context(stimulus: &str, tick: u64) -> String {
    format!("Topic: \"{stimulus}\" Round {tick}.")
}

/// A source of agent decisions.
///
/// Calls for distinct agents may run concurrently, so implementations take
/// `&self` and must be shareable across tasks. Implementations may simply
/// write `async fn decide(...)`.
pub trait DecisionProvider: Send + Sync {
    /// Decide what one agent does this tick.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] when no valid decision could be produced.
    fn decide(
        &self,
        request: DecisionRequest,
    ) -> impl Future<Output = Result<Decision, DecisionError>> + Send;
}

/// A provider that answers every request with the same decision.
#[derive(Debug, Clone)]
pub struct StubDecisionProvider {
    decision: Decision,
}

impl StubDecisionProvider {
    /// Always answer with `decision`.
    pub const fn new(decision: Decision) -> Self {
        Self { decision }
    }
}

impl Default for StubDecisionProvider {
    fn default() -> Self {
        Self::new(Decision::neutral_fallback())
    }
}

impl DecisionProvider for StubDecisionProvider {
    async fn decide(&self, _request: DecisionRequest) -> Result<Decision, DecisionError> {
        Ok(self.decision.clone())
    }
}
