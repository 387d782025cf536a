//! Live feed event schema.
//!
//! The feed is a sequence of JSON records tagged by `type`:
//!
//! ```json
//! {"type": "agents_generated", "count": 2, "agents": [...]}
//! {"type": "turn", "round": 1, "agent_id": "agent-1", "stance": "support", ...}
//! {"type": "report", "report": {...}, "turns_count": 14, "final_beliefs": [...]}
//! {"type": "error", "message": "..."}
//! ```
//!
//! [`decode_frame`] never fails: an undecodable frame becomes an
//! [`FeedEvent::Error`], and an unrecognised `type` becomes
//! [`FeedEvent::Unknown`].

use serde::{Deserialize, Serialize};

use cohort_agents::ExternalPersona;

/// One record from the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// The feed's population was generated.
    AgentsGenerated {
        /// Number of agents the feed announced.
        #[serde(default)]
        count: usize,
        /// The personas, in feed order.
        #[serde(default)]
        agents: Vec<ExternalPersona>,
    },
    /// One agent spoke.
    Turn(Box<TurnEvent>),
    /// The run finished and a report was synthesized.
    Report(ReportEvent),
    /// The feed failed.
    Error {
        /// What went wrong.
        #[serde(default)]
        message: String,
    },
    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

/// A single agent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    /// Round index the turn belongs to.
    pub round: u32,
    /// Feed-assigned agent id (e.g. `agent-3`).
    pub agent_id: String,
    /// Agent display name.
    #[serde(default)]
    pub agent_name: String,
    /// What the agent said.
    #[serde(default)]
    pub message: String,
    /// Free-form stance (`support`, `oppose`, ...).
    #[serde(default)]
    pub stance: String,
    /// Why the agent said it.
    #[serde(default)]
    pub reasoning: String,
    /// Self-reported confidence.
    #[serde(default)]
    pub confidence: f64,
    /// Archetype label as the feed reports it.
    #[serde(default)]
    pub archetype: String,
    /// Belief before the turn, if reported.
    #[serde(default)]
    pub belief_before: Option<String>,
    /// Belief after the turn, if reported.
    #[serde(default)]
    pub belief_after: Option<String>,
}

/// The end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    /// Free-form synthesized report.
    #[serde(default)]
    pub report: serde_json::Value,
    /// Number of turns the run produced.
    #[serde(default)]
    pub turns_count: u64,
    /// Each agent's final belief.
    #[serde(default)]
    pub final_beliefs: Vec<FinalBelief>,
}

/// One agent's closing position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalBelief {
    /// Feed-assigned agent id.
    pub agent_id: String,
    /// Agent display name.
    #[serde(default)]
    pub agent_name: String,
    /// Free-form belief (`support`, `oppose`, ...).
    #[serde(default)]
    pub belief: String,
    /// Self-reported confidence.
    #[serde(default)]
    pub confidence: f64,
}

/// Decode one raw text frame.
pub fn decode_frame(raw: &str) -> FeedEvent {
    serde_json::from_str(raw).unwrap_or_else(|err| FeedEvent::Error {
        message: format!("undecodable frame: {err}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_turn_with_optional_beliefs() {
        let event = decode_frame(
            r#"{"type":"turn","round":2,"agent_id":"agent-4","agent_name":"Sam","message":"No.","stance":"oppose","reasoning":"cost","confidence":0.8,"archetype":"Pragmatic Skeptic","belief_after":"oppose"}"#,
        );
        let FeedEvent::Turn(turn) = event else {
            panic!("expected a turn, got {event:?}");
        };
        assert_eq!(turn.round, 2);
        assert_eq!(turn.agent_id, "agent-4");
        assert_eq!(turn.belief_before, None);
        assert_eq!(turn.belief_after.as_deref(), Some("oppose"));
    }

    #[test]
    fn decodes_agents_generated_with_defaults() {
        let event = decode_frame(
            r#"{"type":"agents_generated","count":1,"agents":[{"name":"Ana","ocean":{"openness":7.6}}]}"#,
        );
        let FeedEvent::AgentsGenerated { count, agents } = event else {
            panic!("expected agents_generated");
        };
        assert_eq!(count, 1);
        let ana = agents.first().unwrap();
        assert_eq!(ana.occupation, "worker");
        assert!((ana.ocean.openness - 7.6).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_types_are_tolerated() {
        assert_eq!(decode_frame(r#"{"type":"heartbeat","n":3}"#), FeedEvent::Unknown);
    }

    #[test]
    fn garbage_becomes_an_error_event() {
        assert!(matches!(decode_frame("{not json"), FeedEvent::Error { .. }));
        // A known type missing its required fields is just as unusable.
        assert!(matches!(
            decode_frame(r#"{"type":"turn","round":1}"#),
            FeedEvent::Error { .. }
        ));
    }

    #[test]
    fn decodes_report() {
        let event = decode_frame(
            r#"{"type":"report","report":{"consensus_level":"low"},"turns_count":3,"final_beliefs":[{"agent_id":"agent-1","belief":"support"}]}"#,
        );
        let FeedEvent::Report(report) = event else {
            panic!("expected report");
        };
        assert_eq!(report.turns_count, 3);
        assert_eq!(report.final_beliefs.len(), 1);
    }
}
