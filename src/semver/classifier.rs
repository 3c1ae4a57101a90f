//! Version classifier.
//!
//! Maps each archetype's rendered bundles to their versions and rejects
//! archetypes whose ordering would be ambiguous.

use std::collections::BTreeMap;

use semver::Version;

use crate::types::{bundle_version, strip_build, Archetype, Bundle};
use super::SemverError;

/// Bundle versions per archetype, keyed by bundle name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleVersions {
    by_archetype: BTreeMap<Archetype, BTreeMap<String, Version>>,
}

impl BundleVersions {
    /// Versions for one archetype. Empty when the archetype had no bundles.
    pub fn get(&self, archetype: Archetype) -> Option<&BTreeMap<String, Version>> {
        self.by_archetype.get(&archetype)
    }

    /// Archetypes in ascending stability order with their versions.
    pub fn iter(&self) -> impl Iterator<Item = (Archetype, &BTreeMap<String, Version>)> {
        self.by_archetype.iter().map(|(a, v)| (*a, v))
    }

    /// Total bundle count across archetypes.
    pub fn len(&self) -> usize {
        self.by_archetype.values().map(BTreeMap::len).sum()
    }

    /// Whether no archetype has bundles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract and validate versions for every archetype.
///
/// Fails on the first bundle without a usable version, or on two bundles
/// of one archetype whose versions are equal once build metadata is
/// dropped. Nothing is returned for a failing batch.
pub fn classify(bundles: &BTreeMap<Archetype, Vec<Bundle>>) -> Result<BundleVersions, SemverError> {
    let mut by_archetype = BTreeMap::new();

    for (&archetype, list) in bundles {
        let mut versions: BTreeMap<String, Version> = BTreeMap::new();
        for bundle in list {
            versions.insert(bundle.name.clone(), bundle_version(bundle)?);
        }

        let mut seen: BTreeMap<Version, &str> = BTreeMap::new();
        for (name, version) in &versions {
            if let Some(partner) = seen.insert(strip_build(version), name.as_str()) {
                return Err(SemverError::AmbiguousVersionOrdering {
                    archetype,
                    bundle: name.clone(),
                    partner: partner.to_string(),
                    version: strip_build(version).to_string(),
                });
            }
        }

        by_archetype.insert(archetype, versions);
    }

    Ok(BundleVersions { by_archetype })
}
