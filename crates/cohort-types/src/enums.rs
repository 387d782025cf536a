//! Enumeration types for the Cohort simulation.
//!
//! Personality dimensions, the stance vocabulary agents answer with, the
//! three sentiment groups, the live-feed vote buckets and the derived
//! personality archetypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Personality dimensions
// ---------------------------------------------------------------------------

/// One of the five Big Five (OCEAN) personality dimensions.
///
/// Serialized with the single-letter keys used in distribution specs
/// (`{A: 8}`); the long names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TraitKind {
    /// Openness to experience.
    #[serde(rename = "O", alias = "openness")]
    Openness,
    /// Conscientiousness.
    #[serde(rename = "C", alias = "conscientiousness")]
    Conscientiousness,
    /// Extraversion.
    #[serde(rename = "E", alias = "extraversion")]
    Extraversion,
    /// Agreeableness.
    #[serde(rename = "A", alias = "agreeableness")]
    Agreeableness,
    /// Neuroticism.
    #[serde(rename = "N", alias = "neuroticism")]
    Neuroticism,
}

impl TraitKind {
    /// All five dimensions in OCEAN order.
    pub const ALL: [Self; 5] = [
        Self::Openness,
        Self::Conscientiousness,
        Self::Extraversion,
        Self::Agreeableness,
        Self::Neuroticism,
    ];

    /// The single-letter key for this dimension.
    pub const fn letter(self) -> char {
        match self {
            Self::Openness => 'O',
            Self::Conscientiousness => 'C',
            Self::Extraversion => 'E',
            Self::Agreeableness => 'A',
            Self::Neuroticism => 'N',
        }
    }
}

// ---------------------------------------------------------------------------
// Stance vocabulary
// ---------------------------------------------------------------------------

/// An agent's categorical position on the current stimulus.
///
/// Scenario families use different subsets (cooperate/defect for dilemma
/// games, support/oppose/undecided for policy debates) but all share this
/// one closed vocabulary so a decision can always be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    /// Works with the others.
    Cooperate,
    /// Acts against the others.
    Defect,
    /// Agrees with what was said.
    Agree,
    /// Disagrees with what was said.
    Disagree,
    /// Pushes back on the framing itself.
    Challenge,
    /// No position taken.
    Neutral,
    /// Backs the proposal under discussion.
    Support,
    /// Rejects the proposal under discussion.
    Oppose,
    /// Has not made up their mind.
    Undecided,
}

impl Stance {
    /// Every member of the vocabulary.
    pub const ALL: [Self; 9] = [
        Self::Cooperate,
        Self::Defect,
        Self::Agree,
        Self::Disagree,
        Self::Challenge,
        Self::Neutral,
        Self::Support,
        Self::Oppose,
        Self::Undecided,
    ];

    /// Whether this stance counts toward the cooperation rate.
    pub const fn is_cooperative(self) -> bool {
        matches!(self, Self::Cooperate | Self::Agree)
    }

    /// The vote bucket this stance falls into on the live feed.
    pub const fn vote(self) -> Vote {
        match self {
            Self::Support => Vote::Support,
            Self::Oppose => Vote::Oppose,
            _ => Vote::Undecided,
        }
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cooperate => "cooperate",
            Self::Defect => "defect",
            Self::Agree => "agree",
            Self::Disagree => "disagree",
            Self::Challenge => "challenge",
            Self::Neutral => "neutral",
            Self::Support => "support",
            Self::Oppose => "oppose",
            Self::Undecided => "undecided",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not in the stance vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stance: {0}")]
pub struct UnknownStance(pub String);

impl FromStr for Stance {
    type Err = UnknownStance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|stance| stance.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStance(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Vote buckets (live feed)
// ---------------------------------------------------------------------------

/// The three-way tally bucket used by the live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    /// In favour.
    Support,
    /// Against.
    Oppose,
    /// Anything else, including unknown beliefs.
    Undecided,
}

impl Vote {
    /// Parse a free-form belief string; anything unrecognised is undecided.
    pub fn from_belief(belief: &str) -> Self {
        belief.parse::<Stance>().map_or(Self::Undecided, Stance::vote)
    }

    /// Display label used as an agent's last action on the live graph.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Support => "Support",
            Self::Oppose => "Oppose",
            Self::Undecided => "Undecided",
        }
    }
}

// ---------------------------------------------------------------------------
// Sentiment groups
// ---------------------------------------------------------------------------

/// The three sentiment buckets the cluster detector partitions into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Sentiment above +0.2.
    Advocates,
    /// Sentiment below -0.2.
    Dissenters,
    /// Everyone in between.
    Observers,
}

impl GroupKind {
    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Advocates => "Advocates",
            Self::Dissenters => "Dissenters",
            Self::Observers => "Observers",
        }
    }

    /// Display colour for the presentation layer.
    pub const fn color(self) -> &'static str {
        match self {
            Self::Advocates => "#2dd4a0",
            Self::Dissenters => "#ee6b90",
            Self::Observers => "#f0b429",
        }
    }
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

/// A label summarizing an agent's dominant personality profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Archetype {
    /// High openness backed by conscientiousness.
    #[serde(rename = "Visionary Analyst")]
    VisionaryAnalyst,
    /// Low openness and low agreeableness.
    #[serde(rename = "Pragmatic Skeptic")]
    PragmaticSkeptic,
    /// Agreeable and outgoing.
    #[serde(rename = "Community Builder")]
    CommunityBuilder,
    /// Anxious but careful.
    #[serde(rename = "Cautious Realist")]
    CautiousRealist,
    /// Disagreeable and outgoing.
    #[serde(rename = "Independent Challenger")]
    IndependentChallenger,
}

impl Archetype {
    /// All archetypes in tie-break order.
    pub const ALL: [Self; 5] = [
        Self::VisionaryAnalyst,
        Self::PragmaticSkeptic,
        Self::CommunityBuilder,
        Self::CautiousRealist,
        Self::IndependentChallenger,
    ];

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::VisionaryAnalyst => "Visionary Analyst",
            Self::PragmaticSkeptic => "Pragmatic Skeptic",
            Self::CommunityBuilder => "Community Builder",
            Self::CautiousRealist => "Cautious Realist",
            Self::IndependentChallenger => "Independent Challenger",
        }
    }

    /// Look up an archetype by its label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
