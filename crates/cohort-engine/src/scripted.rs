//! Trait-driven heuristic decision provider.
//!
//! Stands in for a language model when the engine runs without one.
//! Each agent drifts toward the mood of the room: the mean sentiment of
//! the recent global actions in its request. Agreeable agents follow the
//! room more readily and neurotic agents swing harder. The stance is read
//! off the new sentiment and how far it still sits from the room.
//!
//! Decisions are a pure function of the request, so seeded runs stay
//! reproducible.

use cohort_core::{DecisionError, DecisionProvider, DecisionRequest};
use cohort_types::{Decision, Stance, Traits};

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Drift rate of an agent with minimum agreeableness and neuroticism.
const BASE_PULL: f64 = 0.1;

/// Extra drift at maximum agreeableness.
const AGREEABLE_PULL: f64 = 0.3;

/// Extra drift at maximum neuroticism.
const NEUROTIC_PULL: f64 = 0.2;

/// Gap to the room at or below which the agent goes along.
const ALIGNED_GAP: f64 = 0.25;

/// Gap to the room at or above which the agent pushes back hard.
const OPPOSED_GAP: f64 = 0.75;

/// Agreeableness at or above which alignment becomes cooperation.
const COOPERATIVE_AGREEABLENESS: u8 = 7;

/// Agreeableness at or below which opposition becomes defection.
const DEFECTING_AGREEABLENESS: u8 = 3;

/// Openness at or above which opposition becomes a challenge.
const CHALLENGING_OPENNESS: u8 = 8;

/// Map a `1..=10` score onto `[0, 1]`.
fn unit(score: u8) -> f64 {
    f64::from(score.saturating_sub(1)) / 9.0
}

/// How strongly this personality is pulled toward the room per tick.
fn pull(traits: Traits) -> f64 {
    NEUROTIC_PULL.mul_add(
        unit(traits.neuroticism),
        AGREEABLE_PULL.mul_add(unit(traits.agreeableness), BASE_PULL),
    )
}

/// Pick a stance from the new sentiment and its distance to the room.
const fn stance_for(traits: Traits, sentiment: f64, room: Option<f64>) -> Stance {
    let Some(room) = room else {
        return Stance::Neutral;
    };
    let gap = (sentiment - room).abs();
    if gap <= ALIGNED_GAP {
        if traits.agreeableness >= COOPERATIVE_AGREEABLENESS {
            Stance::Cooperate
        } else {
            Stance::Agree
        }
    } else if gap >= OPPOSED_GAP {
        if traits.openness >= CHALLENGING_OPENNESS {
            Stance::Challenge
        } else if traits.agreeableness <= DEFECTING_AGREEABLENESS {
            Stance::Defect
        } else {
            Stance::Disagree
        }
    } else {
        Stance::Disagree
    }
}

const fn action_for(stance: Stance) -> &'static str {
    match stance {
        Stance::Cooperate => "Offered to help.",
        Stance::Agree | Stance::Support => "Nodded along.",
        Stance::Disagree | Stance::Oppose => "Voiced a concern.",
        Stance::Challenge => "Questioned the premise.",
        Stance::Defect => "Walked away from the group.",
        Stance::Neutral | Stance::Undecided => "Observing.",
    }
}

/// A deterministic provider that imitates social drift.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedDecisionProvider;

impl ScriptedDecisionProvider {
    /// Decide without going through the async trait.
    pub fn decide_now(request: &DecisionRequest) -> Decision {
        let room = if request.recent_actions.is_empty() {
            None
        } else {
            let total: f64 = request.recent_actions.iter().map(|a| a.sentiment).sum();
            Some(total / request.recent_actions.len() as f64)
        };

        let current = request.sentiment;
        let sentiment = room.map_or(current, |room| {
            pull(request.traits)
                .mul_add(room - current, current)
                .clamp(-1.0, 1.0)
        });
        let stance = stance_for(request.traits, sentiment, room);

        let thought = room.map_or_else(
            || format!("Nobody has spoken yet. {}", request.context),
            |room| format!("The room sits at {room:+.2}; I am at {sentiment:+.2}."),
        );

        Decision {
            thought,
            action: action_for(stance).to_owned(),
            sentiment,
            stance,
        }
    }
}

impl DecisionProvider for ScriptedDecisionProvider {
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, DecisionError> {
        Ok(Self::decide_now(&request))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cohort_core::decision::RecentAction;
    use cohort_types::{Agent, AgentId, Archetype, HistoryCaps, SequentialIds};

    use super::*;

    fn request(traits: Traits, sentiment: f64, room: &[f64]) -> DecisionRequest {
        let ids = SequentialIds::default();
        let mut agent = Agent::new(
            AgentId::allocate(&ids),
            String::from("Rin"),
            traits,
            Archetype::CautiousRealist,
            HistoryCaps::default(),
        );
        agent.sentiment = sentiment;
        let mut req = DecisionRequest::for_agent(&agent, 3, &[], "Transit levy");
        req.recent_actions = room
            .iter()
            .map(|&s| RecentAction {
                agent_name: String::from("other"),
                action: String::from("spoke"),
                sentiment: s,
                stance: Stance::Neutral,
            })
            .collect();
        req
    }

    #[test]
    fn empty_room_holds_position() {
        let d = ScriptedDecisionProvider::decide_now(&request(Traits::default(), 0.4, &[]));
        assert!((d.sentiment - 0.4).abs() < 1e-12);
        assert_eq!(d.stance, Stance::Neutral);
        assert!(d.thought.contains("Transit levy"));
    }

    #[test]
    fn agreeable_agents_drift_further() {
        let room = [0.8, 0.8];
        let stubborn = Traits::clamped(5, 5, 5, 1, 1);
        let pliant = Traits::clamped(5, 5, 5, 10, 1);
        let a = ScriptedDecisionProvider::decide_now(&request(stubborn, -0.2, &room));
        let b = ScriptedDecisionProvider::decide_now(&request(pliant, -0.2, &room));
        assert!(a.sentiment > -0.2);
        assert!(b.sentiment > a.sentiment);
        assert!(b.sentiment < 0.8);
    }

    #[test]
    fn sentiment_stays_in_range() {
        let max = Traits::clamped(10, 10, 10, 10, 10);
        let d = ScriptedDecisionProvider::decide_now(&request(max, 1.0, &[1.0, 1.0, 1.0]));
        assert!((-1.0..=1.0).contains(&d.sentiment));
    }

    #[test]
    fn stance_follows_distance_to_room() {
        let agreeable = Traits::clamped(5, 5, 5, 9, 5);
        let close = ScriptedDecisionProvider::decide_now(&request(agreeable, 0.5, &[0.5]));
        assert_eq!(close.stance, Stance::Cooperate);
        assert_eq!(close.action, "Offered to help.");

        let hostile = Traits::clamped(3, 5, 5, 1, 1);
        let far = ScriptedDecisionProvider::decide_now(&request(hostile, -1.0, &[1.0]));
        assert_eq!(far.stance, Stance::Defect);

        let curious = Traits::clamped(9, 5, 5, 1, 1);
        let far = ScriptedDecisionProvider::decide_now(&request(curious, -1.0, &[1.0]));
        assert_eq!(far.stance, Stance::Challenge);
    }

    #[tokio::test]
    async fn provider_never_fails() {
        let provider = ScriptedDecisionProvider;
        let d = provider
            .decide(request(Traits::default(), 0.0, &[0.2]))
            .await
            .unwrap();
        assert_eq!(d.stance, Stance::Agree);
    }
}
