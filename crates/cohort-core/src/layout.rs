//! Force-directed layout relaxation for the presentation layer.
//!
//! One [`layout_step`] per tick moves every agent under four forces:
//!
//! - **Repulsion** from every other agent, `repulsion / d` along the
//!   separating unit vector (`d` floored at `min_distance`).
//! - **Attraction** toward each connected agent, proportional to distance.
//! - **Cohesion** toward the centroid of the agent's current group,
//!   proportional to distance and stronger than the other two.
//! - **Centering** toward `(0.5, 0.5)`.
//!
//! Forces are computed against a snapshot of the positions taken before
//! the step, so the outcome does not depend on agent order. Velocity is
//! damped every step and positions are clamped to the configured bounds.
//! This is a visual heuristic; it does not conserve energy.

use std::collections::BTreeMap;

use cohort_types::{Agent, AgentId, Group, Vec2};

use crate::config::LayoutConfig;

const CANVAS_MID: f64 = 0.5;

/// Advance every agent's position and velocity by one relaxation step.
pub fn layout_step(agents: &mut [Agent], groups: &[Group], config: &LayoutConfig) {
    let positions: Vec<Vec2> = agents.iter().map(|a| a.position).collect();
    let index: BTreeMap<AgentId, usize> =
        agents.iter().enumerate().map(|(i, a)| (a.id, i)).collect();
    let centroids = group_centroids(groups, &positions, &index);

    for (i, agent) in agents.iter_mut().enumerate() {
        let Some(&here) = positions.get(i) else {
            continue;
        };
        let mut force = Vec2::ZERO;

        for (j, there) in positions.iter().enumerate() {
            if i == j {
                continue;
            }
            let dx = here.x - there.x;
            let dy = here.y - there.y;
            let d = dx.hypot(dy).max(config.min_distance);
            let push = config.repulsion / d;
            force.x += dx / d * push;
            force.y += dy / d * push;
        }

        for peer in &agent.connections {
            if let Some(there) = index.get(peer).and_then(|&j| positions.get(j)) {
                force.x += (there.x - here.x) * config.attraction;
                force.y += (there.y - here.y) * config.attraction;
            }
        }

        if let Some(center) = centroids.get(&agent.id) {
            force.x += (center.x - here.x) * config.cohesion;
            force.y += (center.y - here.y) * config.cohesion;
        }

        force.x += (CANVAS_MID - here.x) * config.centering;
        force.y += (CANVAS_MID - here.y) * config.centering;

        integrate(agent, here, force, config);
    }
}

fn integrate(agent: &mut Agent, here: Vec2, force: Vec2, config: &LayoutConfig) {
    let velocity = Vec2::new(
        (agent.velocity.x + force.x) * config.damping,
        (agent.velocity.y + force.y) * config.damping,
    );
    if !velocity.x.is_finite() || !velocity.y.is_finite() {
        agent.velocity = Vec2::ZERO;
        return;
    }
    agent.velocity = velocity;
    agent.position = Vec2::new(
        (here.x + velocity.x).clamp(config.bound_min, config.bound_max),
        (here.y + velocity.y).clamp(config.bound_min, config.bound_max),
    );
}

/// Centroid of each agent's group, keyed by member id.
///
/// Members absent from the population are ignored.
fn group_centroids(
    groups: &[Group],
    positions: &[Vec2],
    index: &BTreeMap<AgentId, usize>,
) -> BTreeMap<AgentId, Vec2> {
    let mut out = BTreeMap::new();
    for group in groups {
        let member_positions: Vec<Vec2> = group
            .members
            .iter()
            .filter_map(|id| index.get(id).and_then(|&j| positions.get(j)).copied())
            .collect();
        if member_positions.is_empty() {
            continue;
        }
        let n = member_positions.len() as f64;
        let center = Vec2::new(
            member_positions.iter().map(|p| p.x).sum::<f64>() / n,
            member_positions.iter().map(|p| p.y).sum::<f64>() / n,
        );
        for id in &group.members {
            out.insert(*id, center);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use cohort_types::{Archetype, GroupKind, HistoryCaps, SequentialIds, Traits};

    use super::*;

    fn agent_at(ids: &SequentialIds, x: f64, y: f64) -> Agent {
        let mut a = Agent::new(
            AgentId::allocate(ids),
            String::from("Nia-300"),
            Traits::default(),
            Archetype::CommunityBuilder,
            HistoryCaps::default(),
        );
        a.position = Vec2::new(x, y);
        a
    }

    fn group_of(members: &[&Agent]) -> Group {
        Group {
            id: GroupKind::Advocates,
            label: GroupKind::Advocates.label().to_owned(),
            color: GroupKind::Advocates.color().to_owned(),
            members: members.iter().map(|a| a.id).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn positions_stay_in_bounds() {
        let ids = SequentialIds::default();
        let mut agents: Vec<Agent> = (0..12)
            .map(|i| {
                let t = f64::from(i) / 12.0;
                agent_at(&ids, 0.05 + t * 0.01, 0.95 - t * 0.01)
            })
            .collect();
        let config = LayoutConfig {
            repulsion: 0.5,
            ..LayoutConfig::default()
        };
        for _ in 0..200 {
            layout_step(&mut agents, &[], &config);
            for a in &agents {
                assert!((0.05..=0.95).contains(&a.position.x));
                assert!((0.05..=0.95).contains(&a.position.y));
            }
        }
    }

    #[test]
    fn coincident_agents_are_pushed_apart() {
        let ids = SequentialIds::default();
        let mut agents = vec![agent_at(&ids, 0.5, 0.5), agent_at(&ids, 0.5, 0.5)];
        agents.get_mut(1).unwrap().position = Vec2::new(0.5001, 0.5);
        layout_step(&mut agents, &[], &LayoutConfig::default());
        let a = agents.first().unwrap().position;
        let b = agents.get(1).unwrap().position;
        assert!(b.x - a.x > 0.0001);
    }

    #[test]
    fn connected_agents_drift_together() {
        let ids = SequentialIds::default();
        let mut agents = vec![agent_at(&ids, 0.2, 0.5), agent_at(&ids, 0.8, 0.5)];
        let second = agents.get(1).unwrap().id;
        let first = agents.first().unwrap().id;
        agents.get_mut(0).unwrap().connections.insert(second);
        agents.get_mut(1).unwrap().connections.insert(first);
        let config = LayoutConfig {
            repulsion: 0.0,
            centering: 0.0,
            ..LayoutConfig::default()
        };
        let before = 0.6;
        for _ in 0..10 {
            layout_step(&mut agents, &[], &config);
        }
        let after = agents.get(1).unwrap().position.x - agents.first().unwrap().position.x;
        assert!(after < before);
    }

    #[test]
    fn group_members_converge_on_centroid() {
        let ids = SequentialIds::default();
        let mut agents = vec![
            agent_at(&ids, 0.1, 0.1),
            agent_at(&ids, 0.9, 0.9),
            agent_at(&ids, 0.5, 0.1),
        ];
        let groups = vec![group_of(&[agents.first().unwrap(), agents.get(1).unwrap()])];
        let config = LayoutConfig {
            repulsion: 0.0,
            centering: 0.0,
            ..LayoutConfig::default()
        };
        layout_step(&mut agents, &groups, &config);
        let a = agents.first().unwrap();
        assert!(a.position.x > 0.1 && a.position.y > 0.1);
        // The loner feels no cohesion and no other force.
        let loner = agents.get(2).unwrap();
        assert!((loner.position.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_velocity_is_reset() {
        let ids = SequentialIds::default();
        let mut agents = vec![agent_at(&ids, 0.3, 0.3)];
        agents.get_mut(0).unwrap().velocity = Vec2::new(f64::NAN, 0.0);
        layout_step(&mut agents, &[], &LayoutConfig::default());
        let a = agents.first().unwrap();
        assert_eq!(a.velocity, Vec2::ZERO);
        assert!((a.position.x - 0.3).abs() < 1e-12);
    }
}
