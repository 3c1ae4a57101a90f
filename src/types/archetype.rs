//! Stability tiers and channel granularity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stability tier of an input bundle list.
///
/// Archetypes are ordered by ascending stability:
/// Candidate < Fast < Stable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    /// Release candidates, least stable.
    Candidate,
    /// Fast-moving releases.
    Fast,
    /// Stable releases, most stable.
    Stable,
}

impl Archetype {
    /// All archetypes in ascending stability order.
    pub const ALL: [Archetype; 3] = [Self::Candidate, Self::Fast, Self::Stable];

    /// Parse archetype from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "candidate" => Some(Self::Candidate),
            "fast" => Some(Self::Fast),
            "stable" => Some(Self::Stable),
            _ => None,
        }
    }

    /// Stability priority. Higher is more stable.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Candidate => 0,
            Self::Fast => 1,
            Self::Stable => 2,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate => write!(f, "candidate"),
            Self::Fast => write!(f, "fast"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

/// Channel naming granularity.
///
/// Selects whether a bundle lands in `<archetype>-v<major>` or
/// `<archetype>-v<major>.<minor>`. Both may be enabled at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// One channel per major version.
    Major,
    /// One channel per major.minor version.
    Minor,
}

impl StreamType {
    /// Both stream types in ascending priority order.
    pub const ALL: [StreamType; 2] = [Self::Major, Self::Minor];

    /// Parse stream type from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }

    /// Intrinsic priority: minor outranks major.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Major => 1,
            Self::Minor => 2,
        }
    }

    /// Channel name for a bundle version in the given archetype.
    pub fn channel_name(&self, archetype: Archetype, version: &semver::Version) -> String {
        match self {
            Self::Major => format!("{}-v{}", archetype, version.major),
            Self::Minor => format!("{}-v{}.{}", archetype, version.major, version.minor),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}
