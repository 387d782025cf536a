//! Sentiment grouping.
//!
//! Groups are recomputed from scratch every tick. They carry no identity
//! across ticks beyond their [`GroupKind`].

use std::collections::BTreeSet;

use cohort_types::{Agent, AgentId, Group, GroupKind};

/// Sentiment above which an agent is an advocate.
pub const ADVOCATE_THRESHOLD: f64 = 0.2;

/// Sentiment below which an agent is a dissenter.
pub const DISSENTER_THRESHOLD: f64 = -0.2;

/// Smallest bucket that is reported as a group.
pub const MIN_GROUP_SIZE: usize = 2;

/// The bucket a sentiment falls into.
pub fn classify(sentiment: f64) -> GroupKind {
    if sentiment > ADVOCATE_THRESHOLD {
        GroupKind::Advocates
    } else if sentiment < DISSENTER_THRESHOLD {
        GroupKind::Dissenters
    } else {
        GroupKind::Observers
    }
}

/// Partition the population into sentiment groups.
///
/// Groups come back in the order advocates, dissenters, observers, and a
/// bucket with fewer than [`MIN_GROUP_SIZE`] members is omitted.
pub fn detect_groups(agents: &[Agent]) -> Vec<Group> {
    let mut advocates = BTreeSet::new();
    let mut dissenters = BTreeSet::new();
    let mut observers = BTreeSet::new();
    for agent in agents {
        let bucket = match classify(agent.sentiment) {
            GroupKind::Advocates => &mut advocates,
            GroupKind::Dissenters => &mut dissenters,
            GroupKind::Observers => &mut observers,
        };
        bucket.insert(agent.id);
    }

    [
        (GroupKind::Advocates, advocates),
        (GroupKind::Dissenters, dissenters),
        (GroupKind::Observers, observers),
    ]
    .into_iter()
    .filter(|(_, members)| members.len() >= MIN_GROUP_SIZE)
    .map(|(kind, members)| group(kind, members))
    .collect()
}

fn group(kind: GroupKind, members: BTreeSet<AgentId>) -> Group {
    Group {
        id: kind,
        label: kind.label().to_owned(),
        color: kind.color().to_owned(),
        members,
    }
}
