//! Decision commit onto agent state.
//!
//! The turn scheduler is the only writer of an agent's sentiment, stance,
//! and memory. It goes through [`apply_decision`] so that clamping and
//! history trimming happen in exactly one place.

use cohort_types::{Agent, Decision};

/// Clamp a sentiment into `[-1, 1]`; non-finite values become neutral.
pub fn clamp_sentiment(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Commit a decision to an agent, returning the sentiment actually stored.
///
/// Updates the current sentiment, pushes onto the sentiment, stance, and
/// memory histories (each evicting its oldest entry once full), and
/// records the last action and thought.
pub fn apply_decision(agent: &mut Agent, decision: &Decision) -> f64 {
    let sentiment = clamp_sentiment(decision.sentiment);
    agent.sentiment = sentiment;
    agent.sentiment_history.push(sentiment);
    agent.stance_history.push(decision.stance);
    agent.memory.push(decision.action.clone());
    agent.last_action = Some(decision.action.clone());
    agent.last_thought = Some(decision.thought.clone());
    sentiment
}
