//! Channel types for the upgrade graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Schema tag for channel documents.
pub const SCHEMA_CHANNEL: &str = "olm.channel";

/// A node in a channel's upgrade graph.
///
/// Edges point backwards: `replaces` and `skips` name the predecessors
/// an installation of this entry may upgrade from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    /// Bundle name this entry refers to.
    pub name: String,
    /// Single direct predecessor. `None` marks the start of a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    /// Additional predecessors reachable without intermediate entries.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skips: BTreeSet<String>,
    /// Opaque version range, copied verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_range: Option<String>,
}

impl ChannelEntry {
    /// Create a bare entry with no edges.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the `replaces` edge.
    pub fn with_replaces(mut self, replaces: impl Into<String>) -> Self {
        self.replaces = Some(replaces.into());
        self
    }

    /// Add skip edges.
    pub fn with_skips(mut self, skips: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skips.extend(skips.into_iter().map(Into::into));
        self
    }

    /// Set the skip range.
    pub fn with_skip_range(mut self, range: impl Into<String>) -> Self {
        self.skip_range = Some(range.into());
        self
    }

    /// Whether this entry names `other` as a predecessor.
    pub fn references(&self, other: &str) -> bool {
        self.replaces.as_deref() == Some(other) || self.skips.contains(other)
    }

    /// Drop every outgoing edge, keeping the name.
    pub fn clear_edges(&mut self) {
        self.replaces = None;
        self.skips.clear();
        self.skip_range = None;
    }
}

/// A named per-package upgrade graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Document schema tag.
    #[serde(default = "default_channel_schema")]
    pub schema: String,
    /// Channel name.
    pub name: String,
    /// Owning package name.
    pub package: String,
    /// Graph nodes. Entry names are unique within a channel.
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
}

fn default_channel_schema() -> String {
    SCHEMA_CHANNEL.to_string()
}

impl Channel {
    /// Create an empty channel.
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            schema: default_channel_schema(),
            name: name.into(),
            package: package.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: ChannelEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Find an entry by name.
    pub fn entry(&self, name: &str) -> Option<&ChannelEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Whether the channel contains an entry with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }
}
