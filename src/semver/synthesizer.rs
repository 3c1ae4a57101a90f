//! Channel synthesizer.
//!
//! Creates the provisional channels for a package from classified bundle
//! versions and records one [`EntryTuple`] per placed node for the linker.
//!
//! ## Algorithm
//!
//! 1. Walk archetypes in ascending stability order
//! 2. Within an archetype, walk bundles in ascending version order
//! 3. For each enabled stream type, compute the channel name and append
//!    a bare entry to it, creating the channel on first touch
//! 4. Every newly created channel challenges the highwater marker; the
//!    final marker names the package default channel

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use semver::Version;
use tracing::debug;

use crate::policy::GenerationPolicy;
use crate::types::{cmp_precedence, Archetype, Channel, ChannelEntry, StreamType};
use super::classifier::BundleVersions;

/// A placed node awaiting edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTuple {
    /// Archetype the bundle was listed under.
    pub archetype: Archetype,
    /// Stream type of the owning channel.
    pub stream: StreamType,
    /// Owning channel name.
    pub channel: String,
    /// Bundle name.
    pub name: String,
    /// Bundle version.
    pub version: Version,
    /// Position of the node in its channel.
    pub index: usize,
}

/// Most stable channel seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighwaterChannel {
    /// Channel archetype.
    pub archetype: Archetype,
    /// Channel stream type.
    pub stream: StreamType,
    /// Version of the bundle that created the channel.
    pub version: Version,
    /// Channel name.
    pub name: String,
}

impl HighwaterChannel {
    /// Whether `self` should replace `other` as highwater.
    ///
    /// Precedence: archetype stability, then version, then the preferred
    /// stream type, then intrinsic stream priority.
    pub fn outranks(&self, other: &Self, preference: StreamType) -> bool {
        let ord = self
            .archetype
            .priority()
            .cmp(&other.archetype.priority())
            .then_with(|| cmp_precedence(&self.version, &other.version));
        match ord {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal if self.stream == other.stream => false,
            Ordering::Equal if self.stream == preference => true,
            Ordering::Equal if other.stream == preference => false,
            Ordering::Equal => self.stream.priority() > other.stream.priority(),
        }
    }
}

/// Fold a challenger into the current highwater marker.
pub fn challenge(
    current: Option<HighwaterChannel>,
    challenger: HighwaterChannel,
    preference: StreamType,
) -> Option<HighwaterChannel> {
    match current {
        Some(current) if !challenger.outranks(&current, preference) => Some(current),
        _ => Some(challenger),
    }
}

/// Provisional channels and the linking worklist.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedChannels {
    /// Channels by name, entries without edges.
    pub channels: BTreeMap<String, Channel>,
    /// One tuple per placed entry, in placement order.
    pub entries: Vec<EntryTuple>,
    /// Default channel candidate.
    pub highwater: Option<HighwaterChannel>,
}

/// Build provisional channels for `package`.
pub fn synthesize(
    package: &str,
    versions: &BundleVersions,
    policy: &GenerationPolicy,
) -> SynthesizedChannels {
    let mut out = SynthesizedChannels::default();

    for (archetype, bundles) in versions.iter() {
        if bundles.is_empty() {
            continue;
        }

        let mut ordered: Vec<(&String, &Version)> = bundles.iter().collect();
        ordered.sort_by(|a, b| cmp_precedence(a.1, b.1).then_with(|| a.0.cmp(b.0)));

        for (name, version) in ordered {
            for stream in policy.enabled() {
                let channel_name = stream.channel_name(archetype, version);
                let channel = match out.channels.entry(channel_name.clone()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => {
                        debug!(
                            channel = %channel_name,
                            %archetype,
                            %stream,
                            %version,
                            "Creating channel"
                        );
                        out.highwater = challenge(
                            out.highwater.take(),
                            HighwaterChannel {
                                archetype,
                                stream,
                                version: version.clone(),
                                name: channel_name.clone(),
                            },
                            policy.preference,
                        );
                        slot.insert(Channel::new(channel_name.clone(), package))
                    }
                };

                let index = channel.push(ChannelEntry::new(name.clone()));
                out.entries.push(EntryTuple {
                    archetype,
                    stream,
                    channel: channel_name,
                    name: name.clone(),
                    version: version.clone(),
                    index,
                });
            }
        }
    }

    out
}
