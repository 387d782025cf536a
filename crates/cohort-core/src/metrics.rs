//! Per-tick aggregate metrics.

use cohort_types::{Agent, Group, TimeSeriesPoint};

/// Mean sentiment over all agents; `0.0` for an empty population.
pub fn avg_sentiment(agents: &[Agent]) -> f64 {
    if agents.is_empty() {
        return 0.0;
    }
    agents.iter().map(|a| a.sentiment).sum::<f64>() / agents.len() as f64
}

/// Twice the population standard deviation of sentiment, clamped to `[0, 1]`.
pub fn polarization(agents: &[Agent]) -> f64 {
    if agents.is_empty() {
        return 0.0;
    }
    let mean = avg_sentiment(agents);
    let variance = agents
        .iter()
        .map(|a| (a.sentiment - mean).powi(2))
        .sum::<f64>()
        / agents.len() as f64;
    let spread = variance.sqrt() * 2.0;
    if spread.is_finite() {
        spread.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Mean per-agent share of cooperative stances, in `[0, 1]`.
///
/// An agent with no stance history counts as `0.5`.
pub fn cooperation_rate(agents: &[Agent]) -> f64 {
    if agents.is_empty() {
        return 0.0;
    }
    agents.iter().map(Agent::cooperation_ratio).sum::<f64>() / agents.len() as f64
}

/// Number of groups as a `u32`.
pub fn group_count(groups: &[Group]) -> u32 {
    u32::try_from(groups.len()).unwrap_or(u32::MAX)
}

/// Measure one tick.
pub fn measure(tick: u64, agents: &[Agent], groups: &[Group]) -> TimeSeriesPoint {
    TimeSeriesPoint {
        tick,
        avg_sentiment: avg_sentiment(agents),
        polarization: polarization(agents),
        cooperation_pct: cooperation_rate(agents) * 100.0,
        group_count: group_count(groups),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cohort_types::{AgentId, Archetype, HistoryCaps, SequentialIds, Stance, Traits};

    use super::*;
    use crate::cluster::detect_groups;

    fn agents(sentiments: &[f64]) -> Vec<Agent> {
        let ids = SequentialIds::default();
        sentiments
            .iter()
            .map(|&s| {
                let mut a = Agent::new(
                    AgentId::allocate(&ids),
                    String::from("Eve-909"),
                    Traits::default(),
                    Archetype::CautiousRealist,
                    HistoryCaps::default(),
                );
                a.sentiment = s;
                a
            })
            .collect()
    }

    #[test]
    fn identical_sentiments_have_zero_polarization() {
        assert!(polarization(&agents(&[0.4, 0.4, 0.4])).abs() < 1e-12);
    }

    #[test]
    fn even_split_at_the_poles_is_fully_polarized() {
        let population = agents(&[1.0, -1.0, 1.0, -1.0]);
        assert!((polarization(&population) - 1.0).abs() < 1e-12);
        assert!(avg_sentiment(&population).abs() < 1e-12);
    }

    #[test]
    fn polarization_scales_with_spread() {
        // std dev 0.25, doubled.
        let population = agents(&[0.25, -0.25]);
        assert!((polarization(&population) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_history_counts_as_half_cooperative() {
        let mut population = agents(&[0.0, 0.0]);
        let first = population.first_mut().unwrap();
        first.stance_history.push(Stance::Cooperate);
        first.stance_history.push(Stance::Defect);
        first.stance_history.push(Stance::Agree);
        first.stance_history.push(Stance::Agree);
        // (0.75 + 0.5) / 2
        assert!((cooperation_rate(&population) - 0.625).abs() < 1e-12);
    }

    #[test]
    fn measure_reports_percent_and_group_count() {
        let population = agents(&[0.5, 0.6, -0.5, -0.6, 0.0]);
        let groups = detect_groups(&population);
        let point = measure(3, &population, &groups);
        assert_eq!(point.tick, 3);
        assert_eq!(point.group_count, 2);
        assert!((point.cooperation_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_population_measures_zero() {
        let point = measure(1, &[], &[]);
        assert!(point.avg_sentiment.abs() < f64::EPSILON);
        assert!(point.polarization.abs() < f64::EPSILON);
        assert_eq!(point.group_count, 0);
    }
}
