//! Archetype derivation from Big Five scores.
//!
//! Each archetype has a weighted score over the trait vector; the agent's
//! archetype is the highest-scoring one, with ties going to the archetype
//! listed first in [`Archetype::ALL`].

use cohort_types::{Archetype, Traits};

/// Score one archetype against a trait vector.
pub fn score(archetype: Archetype, traits: Traits) -> f64 {
    let o = f64::from(traits.openness);
    let c = f64::from(traits.conscientiousness);
    let e = f64::from(traits.extraversion);
    let a = f64::from(traits.agreeableness);
    let n = f64::from(traits.neuroticism);

    match archetype {
        Archetype::VisionaryAnalyst => o.mul_add(0.6, c * 0.4),
        Archetype::PragmaticSkeptic => (10.0 - o).mul_add(0.6, (10.0 - a) * 0.4),
        Archetype::CommunityBuilder => a.mul_add(0.55, e * 0.45),
        Archetype::CautiousRealist => n.mul_add(0.6, c * 0.4),
        Archetype::IndependentChallenger => (10.0 - a).mul_add(0.55, e * 0.45),
    }
}

/// Derive the dominant archetype for a trait vector.
pub fn derive(traits: Traits) -> Archetype {
    let mut best = Archetype::VisionaryAnalyst;
    let mut best_score = f64::NEG_INFINITY;
    for archetype in Archetype::ALL {
        let s = score(archetype, traits);
        // Strictly greater keeps the earlier archetype on ties.
        if s > best_score {
            best = archetype;
            best_score = s;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_conscientious_agent_is_visionary() {
        let t = Traits::clamped(10, 9, 3, 5, 2);
        assert_eq!(derive(t), Archetype::VisionaryAnalyst);
    }

    #[test]
    fn closed_disagreeable_agent_is_skeptic() {
        let t = Traits::clamped(1, 2, 2, 1, 3);
        assert_eq!(derive(t), Archetype::PragmaticSkeptic);
    }

    #[test]
    fn warm_outgoing_agent_is_community_builder() {
        let t = Traits::clamped(4, 3, 10, 10, 2);
        assert_eq!(derive(t), Archetype::CommunityBuilder);
    }

    #[test]
    fn anxious_agent_is_cautious_realist() {
        let t = Traits::clamped(3, 8, 2, 6, 10);
        assert_eq!(derive(t), Archetype::CautiousRealist);
    }

    #[test]
    fn disagreeable_extravert_is_challenger() {
        let t = Traits::clamped(6, 2, 10, 1, 2);
        assert_eq!(derive(t), Archetype::IndependentChallenger);
    }

    #[test]
    fn ties_resolve_to_earlier_archetype() {
        // O = C = A = 5 gives Visionary and Skeptic the same score.
        let t = Traits::clamped(5, 5, 1, 5, 1);
        assert!((score(Archetype::VisionaryAnalyst, t) - score(Archetype::PragmaticSkeptic, t)).abs() < 1e-12);
        assert_eq!(derive(t), Archetype::VisionaryAnalyst);
    }
}
