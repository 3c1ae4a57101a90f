//! Graph linker.
//!
//! A single global pass that turns provisional channels into linked ones.
//!
//! ## Algorithm
//!
//! 1. Sort all entry tuples by (archetype priority, stream priority,
//!    version). This yields one ascending walk per (archetype, stream)
//!    partition.
//! 2. Walk adjacent pairs `(prev, cur)` and classify the transition.
//! 3. On any archetype, stream, major, or minor change, `prev` is the
//!    head of its minor stream: it replaces the previous minor head and
//!    skips everything accumulated since the last hard boundary.
//! 4. Archetype, stream, and major changes are hard boundaries that reset
//!    the accumulator, so no edge ever crosses them.
//! 5. The last tuple is finalized once more after the walk.
//!
//! Entries that are not the head of a minor stream keep no edges; their
//! minor head reaches them through `skips`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::types::{cmp_precedence, Channel};
use super::synthesizer::EntryTuple;

/// How two adjacent tuples differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    /// Archetype differs.
    pub arch_change: bool,
    /// Stream type differs.
    pub kind_change: bool,
    /// Major version differs.
    pub x_change: bool,
    /// Minor version differs.
    pub y_change: bool,
}

impl Transition {
    /// Classify the step from `prev` to `cur`.
    pub fn between(prev: &EntryTuple, cur: &EntryTuple) -> Self {
        Self {
            arch_change: prev.archetype != cur.archetype,
            kind_change: prev.stream != cur.stream,
            x_change: prev.version.major != cur.version.major,
            y_change: prev.version.minor != cur.version.minor,
        }
    }

    /// Whether `prev` ends a minor stream.
    pub fn ends_stream(&self) -> bool {
        self.is_hard_boundary() || self.y_change
    }

    /// Whether edges must not cross this step.
    pub fn is_hard_boundary(&self) -> bool {
        self.arch_change || self.kind_change || self.x_change
    }
}

/// Linking state carried from one step to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAccumulator {
    /// Head of the previous minor stream in this partition.
    pub prev_zmax: Option<String>,
    /// Names accumulated since the last hard boundary.
    pub cur_skips: BTreeSet<String>,
}

impl LinkAccumulator {
    /// Edges for a finalized minor-stream head.
    pub fn edges(&self) -> (Option<String>, BTreeSet<String>) {
        let mut skips = self.cur_skips.clone();
        if let Some(replaces) = &self.prev_zmax {
            skips.remove(replaces);
        }
        (self.prev_zmax.clone(), skips)
    }

    /// Advance past `prev` given the transition that follows it.
    pub fn advance(mut self, prev: &EntryTuple, transition: Transition) -> Self {
        if transition.is_hard_boundary() {
            return Self::default();
        }
        if transition.y_change {
            self.prev_zmax = Some(prev.name.clone());
        }
        self.cur_skips.insert(prev.name.clone());
        self
    }
}

/// Sort order of the linking walk.
fn walk_order(a: &EntryTuple, b: &EntryTuple) -> std::cmp::Ordering {
    a.archetype
        .priority()
        .cmp(&b.archetype.priority())
        .then_with(|| a.stream.priority().cmp(&b.stream.priority()))
        .then_with(|| cmp_precedence(&a.version, &b.version))
        .then_with(|| a.channel.cmp(&b.channel))
        .then_with(|| a.name.cmp(&b.name))
}

fn finalize(channels: &mut BTreeMap<String, Channel>, tuple: &EntryTuple, acc: &LinkAccumulator) {
    let Some(entry) = channels
        .get_mut(&tuple.channel)
        .and_then(|c| c.entries.get_mut(tuple.index))
    else {
        return;
    };
    let (replaces, skips) = acc.edges();
    trace!(
        channel = %tuple.channel,
        entry = %tuple.name,
        replaces = ?replaces,
        skips = skips.len(),
        "Finalizing minor stream head"
    );
    entry.replaces = replaces;
    entry.skips = skips;
}

/// Compute `replaces`/`skips` edges and return channels sorted by name.
pub fn link(mut channels: BTreeMap<String, Channel>, mut entries: Vec<EntryTuple>) -> Vec<Channel> {
    entries.sort_by(walk_order);

    let mut acc = LinkAccumulator::default();
    for pair in entries.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let transition = Transition::between(prev, cur);
        if transition.ends_stream() {
            finalize(&mut channels, prev, &acc);
        }
        acc = acc.advance(prev, transition);
    }
    if let Some(last) = entries.last() {
        finalize(&mut channels, last, &acc);
    }

    debug!(
        channels = channels.len(),
        entries = entries.len(),
        "Linked channels"
    );
    channels.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::GenerationPolicy;
    use crate::semver::classifier::classify;
    use crate::semver::synthesizer::synthesize;
    use crate::types::{Archetype, Bundle, ChannelEntry, StreamType};
    use proptest::prelude::*;

    fn build(input: Vec<(Archetype, Vec<&str>)>, policy: GenerationPolicy) -> Vec<Channel> {
        let mut map = BTreeMap::new();
        for (archetype, list) in input {
            let bundles = list
                .into_iter()
                .map(|v| Bundle::new(format!("a-v{v}"), "a", format!("img:{v}"), v))
                .collect::<Vec<_>>();
            map.insert(archetype, bundles);
        }
        let versions = classify(&map).unwrap();
        let out = synthesize("a", &versions, &policy);
        link(out.channels, out.entries)
    }

    fn major_only() -> GenerationPolicy {
        GenerationPolicy::resolve(true, false, None).unwrap()
    }

    fn minor_only() -> GenerationPolicy {
        GenerationPolicy::resolve(false, true, None).unwrap()
    }

    fn entry<'a>(channels: &'a [Channel], channel: &str, name: &str) -> &'a ChannelEntry {
        channels
            .iter()
            .find(|c| c.name == channel)
            .and_then(|c| c.entry(name))
            .unwrap()
    }

    #[test]
    fn test_transition_classification() {
        let t = |arch, stream, v: &str| EntryTuple {
            archetype: arch,
            stream,
            channel: String::new(),
            name: v.to_string(),
            version: semver::Version::parse(v).unwrap(),
            index: 0,
        };
        let a = t(Archetype::Stable, StreamType::Minor, "1.2.3");
        let tr = Transition::between(&a, &t(Archetype::Stable, StreamType::Minor, "1.2.4"));
        assert!(!tr.ends_stream());
        let tr = Transition::between(&a, &t(Archetype::Stable, StreamType::Minor, "1.3.0"));
        assert!(tr.ends_stream() && !tr.is_hard_boundary());
        let tr = Transition::between(&a, &t(Archetype::Stable, StreamType::Minor, "2.2.3"));
        assert!(tr.is_hard_boundary());
        let tr = Transition::between(&a, &t(Archetype::Stable, StreamType::Major, "1.2.3"));
        assert!(tr.kind_change && tr.is_hard_boundary());
    }

    #[test]
    fn test_two_patch_releases_in_major_channel() {
        let channels = build(vec![(Archetype::Stable, vec!["0.1.0", "0.1.1"])], major_only());
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "stable-v0");

        let head = entry(&channels, "stable-v0", "a-v0.1.1");
        assert_eq!(head.replaces, None);
        assert_eq!(head.skips, BTreeSet::from(["a-v0.1.0".to_string()]));
        assert_eq!(entry(&channels, "stable-v0", "a-v0.1.0"), &ChannelEntry::new("a-v0.1.0"));
    }

    #[test]
    fn test_minor_heads_chain_within_major_channel() {
        let channels = build(
            vec![(Archetype::Stable, vec!["0.1.0", "0.1.1", "0.2.0", "0.2.1", "0.3.0"])],
            major_only(),
        );
        let e = |n| entry(&channels, "stable-v0", n);

        assert_eq!(e("a-v0.1.1").replaces, None);
        assert_eq!(e("a-v0.1.1").skips, BTreeSet::from(["a-v0.1.0".to_string()]));

        assert_eq!(e("a-v0.2.1").replaces.as_deref(), Some("a-v0.1.1"));
        assert_eq!(
            e("a-v0.2.1").skips,
            BTreeSet::from(["a-v0.1.0".to_string(), "a-v0.2.0".to_string()])
        );

        assert_eq!(e("a-v0.3.0").replaces.as_deref(), Some("a-v0.2.1"));
        assert_eq!(
            e("a-v0.3.0").skips,
            BTreeSet::from([
                "a-v0.1.0".to_string(),
                "a-v0.1.1".to_string(),
                "a-v0.2.0".to_string(),
            ])
        );

        // Non-heads stay edge-less.
        assert_eq!(e("a-v0.2.0"), &ChannelEntry::new("a-v0.2.0"));
    }

    #[test]
    fn test_minor_channels_link_across_minor_streams() {
        let channels = build(
            vec![(Archetype::Stable, vec!["1.0.0", "1.0.1", "1.1.0", "2.0.0"])],
            minor_only(),
        );
        let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["stable-v1.0", "stable-v1.1", "stable-v2.0"]);

        let head = entry(&channels, "stable-v1.1", "a-v1.1.0");
        assert_eq!(head.replaces.as_deref(), Some("a-v1.0.1"));
        assert_eq!(head.skips, BTreeSet::from(["a-v1.0.0".to_string()]));

        // Major boundary: 2.0.0 starts fresh.
        assert_eq!(entry(&channels, "stable-v2.0", "a-v2.0.0"), &ChannelEntry::new("a-v2.0.0"));
    }

    #[test]
    fn test_no_edges_across_archetypes() {
        let channels = build(
            vec![
                (Archetype::Candidate, vec!["1.0.0", "1.0.1"]),
                (Archetype::Stable, vec!["1.0.2"]),
            ],
            major_only(),
        );
        assert_eq!(
            entry(&channels, "candidate-v1", "a-v1.0.1").skips,
            BTreeSet::from(["a-v1.0.0".to_string()])
        );
        assert_eq!(entry(&channels, "stable-v1", "a-v1.0.2"), &ChannelEntry::new("a-v1.0.2"));
    }

    #[test]
    fn test_empty_worklist() {
        assert!(link(BTreeMap::new(), Vec::new()).is_empty());
    }

    fn version_set() -> impl Strategy<Value = BTreeSet<(u64, u64, u64)>> {
        prop::collection::btree_set((0u64..3, 0u64..3, 0u64..4), 1..12)
    }

    proptest! {
        #[test]
        fn prop_edges_stay_within_partition(
            candidate in version_set(),
            stable in version_set(),
        ) {
            let mut map = BTreeMap::new();
            for (archetype, set) in [(Archetype::Candidate, &candidate), (Archetype::Stable, &stable)] {
                let bundles = set
                    .iter()
                    .map(|(x, y, z)| {
                        let v = format!("{x}.{y}.{z}");
                        Bundle::new(format!("{archetype}-{v}"), "a", format!("img:{archetype}:{v}"), v)
                    })
                    .collect::<Vec<_>>();
                map.insert(archetype, bundles);
            }
            let policy = GenerationPolicy::resolve(true, true, Some(StreamType::Minor)).unwrap();
            let versions = classify(&map).unwrap();
            let out = synthesize("a", &versions, &policy);
            let channels = link(out.channels, out.entries);

            let partition = |name: &str| -> (String, String) {
                let (arch, v) = name.split_once('-').unwrap();
                (arch.to_string(), v.split('.').next().unwrap().to_string())
            };

            for channel in &channels {
                let mut seen = BTreeSet::new();
                for e in &channel.entries {
                    prop_assert!(seen.insert(e.name.clone()), "duplicate {}", e.name);
                    prop_assert!(!e.references(&e.name));
                    if let Some(r) = &e.replaces {
                        prop_assert!(!e.skips.contains(r));
                    }
                    for target in e.replaces.iter().chain(e.skips.iter()) {
                        prop_assert_eq!(partition(target), partition(&e.name));
                    }
                }
            }
        }
    }
}
