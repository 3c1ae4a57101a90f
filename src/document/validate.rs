//! Whole-document validation.
//!
//! Mirrors the checks a catalog model conversion performs. The kernel
//! never bypasses it: splicing re-validates its result through a
//! [`DocumentValidator`] before returning.

use std::collections::{BTreeMap, BTreeSet};

use super::DeclarativeConfig;
use crate::types::Channel;

/// A rule violated by a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Two packages share a name.
    #[error("Duplicate package {0:?}")]
    DuplicatePackage(String),
    /// A channel or bundle refers to an undeclared package.
    #[error("{kind} {name:?} belongs to undeclared package {package:?}")]
    UnknownPackage {
        /// "channel" or "bundle".
        kind: &'static str,
        /// Document name.
        name: String,
        /// Missing package.
        package: String,
    },
    /// A package's default channel does not exist.
    #[error("Package {package:?} default channel {channel:?} not found")]
    UnknownDefaultChannel {
        /// Package name.
        package: String,
        /// Missing channel.
        channel: String,
    },
    /// Two bundles share a name.
    #[error("Duplicate bundle {0:?}")]
    DuplicateBundle(String),
    /// Two channels of one package share a name.
    #[error("Duplicate channel {channel:?} in package {package:?}")]
    DuplicateChannel {
        /// Package name.
        package: String,
        /// Channel name.
        channel: String,
    },
    /// A channel lists the same entry twice.
    #[error("Channel {channel:?} has duplicate entry {entry:?}")]
    DuplicateEntry {
        /// Channel name.
        channel: String,
        /// Entry name.
        entry: String,
    },
    /// A channel entry names a bundle the package does not have.
    #[error("Channel {channel:?} entry {entry:?} has no bundle in package {package:?}")]
    MissingBundle {
        /// Package name.
        package: String,
        /// Channel name.
        channel: String,
        /// Entry name.
        entry: String,
    },
    /// An entry names itself as a predecessor.
    #[error("Channel {channel:?} entry {entry:?} references itself")]
    SelfReference {
        /// Channel name.
        channel: String,
        /// Entry name.
        entry: String,
    },
    /// A channel has zero or several heads.
    #[error("Channel {channel:?} must have exactly one head, found {heads:?}")]
    HeadCount {
        /// Channel name.
        channel: String,
        /// Candidate heads.
        heads: Vec<String>,
    },
    /// Following `replaces` loops back on itself.
    #[error("Channel {channel:?} has a replaces cycle through {entry:?}")]
    ReplacesCycle {
        /// Channel name.
        channel: String,
        /// Entry on the cycle.
        entry: String,
    },
}

/// Validates a complete document.
pub trait DocumentValidator: Send + Sync {
    /// Return the first violated rule, if any.
    fn validate(&self, cfg: &DeclarativeConfig) -> Result<(), ValidationError>;
}

/// Default validator implementing the catalog model rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValidator;

impl ModelValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    fn validate_channel(
        channel: &Channel,
        package_bundles: Option<&BTreeSet<&str>>,
    ) -> Result<(), ValidationError> {
        let mut names = BTreeSet::new();
        for entry in &channel.entries {
            if !names.insert(entry.name.as_str()) {
                return Err(ValidationError::DuplicateEntry {
                    channel: channel.name.clone(),
                    entry: entry.name.clone(),
                });
            }
            if !package_bundles.is_some_and(|b| b.contains(entry.name.as_str())) {
                return Err(ValidationError::MissingBundle {
                    package: channel.package.clone(),
                    channel: channel.name.clone(),
                    entry: entry.name.clone(),
                });
            }
            if entry.references(&entry.name) {
                return Err(ValidationError::SelfReference {
                    channel: channel.name.clone(),
                    entry: entry.name.clone(),
                });
            }
        }

        if channel.entries.is_empty() {
            return Ok(());
        }

        // Head: an entry no other entry of this channel points at.
        let referenced: BTreeSet<&str> = channel
            .entries
            .iter()
            .flat_map(|e| e.replaces.iter().chain(e.skips.iter()))
            .map(String::as_str)
            .collect();
        let heads: Vec<String> = channel
            .entries
            .iter()
            .filter(|e| !referenced.contains(e.name.as_str()))
            .map(|e| e.name.clone())
            .collect();
        if heads.len() != 1 {
            return Err(ValidationError::HeadCount {
                channel: channel.name.clone(),
                heads,
            });
        }

        let replaces: BTreeMap<&str, &str> = channel
            .entries
            .iter()
            .filter_map(|e| e.replaces.as_deref().map(|r| (e.name.as_str(), r)))
            .collect();
        for start in replaces.keys() {
            let mut seen = BTreeSet::new();
            let mut cur = *start;
            while let Some(next) = replaces.get(cur) {
                if !seen.insert(cur) {
                    return Err(ValidationError::ReplacesCycle {
                        channel: channel.name.clone(),
                        entry: cur.to_string(),
                    });
                }
                cur = *next;
            }
        }
        Ok(())
    }
}

impl DocumentValidator for ModelValidator {
    fn validate(&self, cfg: &DeclarativeConfig) -> Result<(), ValidationError> {
        let mut packages = BTreeSet::new();
        for p in &cfg.packages {
            if !packages.insert(p.name.as_str()) {
                return Err(ValidationError::DuplicatePackage(p.name.clone()));
            }
        }

        let mut bundle_names = BTreeSet::new();
        let mut bundles_by_package: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for b in &cfg.bundles {
            if !packages.contains(b.package.as_str()) {
                return Err(ValidationError::UnknownPackage {
                    kind: "bundle",
                    name: b.name.clone(),
                    package: b.package.clone(),
                });
            }
            if !bundle_names.insert(b.name.as_str()) {
                return Err(ValidationError::DuplicateBundle(b.name.clone()));
            }
            bundles_by_package
                .entry(b.package.as_str())
                .or_default()
                .insert(b.name.as_str());
        }

        let mut channel_names: BTreeSet<(&str, &str)> = BTreeSet::new();
        for c in &cfg.channels {
            if !packages.contains(c.package.as_str()) {
                return Err(ValidationError::UnknownPackage {
                    kind: "channel",
                    name: c.name.clone(),
                    package: c.package.clone(),
                });
            }
            if !channel_names.insert((c.package.as_str(), c.name.as_str())) {
                return Err(ValidationError::DuplicateChannel {
                    package: c.package.clone(),
                    channel: c.name.clone(),
                });
            }
            Self::validate_channel(c, bundles_by_package.get(c.package.as_str()))?;
        }

        for p in &cfg.packages {
            if let Some(default) = &p.default_channel {
                if !channel_names.contains(&(p.name.as_str(), default.as_str())) {
                    return Err(ValidationError::UnknownDefaultChannel {
                        package: p.name.clone(),
                        channel: default.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bundle, ChannelEntry, Package};

    fn base_config() -> DeclarativeConfig {
        let mut channel = Channel::new("stable", "a");
        channel.push(ChannelEntry::new("a.v1"));
        channel.push(ChannelEntry::new("a.v2").with_replaces("a.v1"));
        DeclarativeConfig {
            packages: vec![Package::new("a").with_default_channel("stable")],
            channels: vec![channel],
            bundles: vec![
                Bundle::new("a.v1", "a", "img:1", "1.0.0"),
                Bundle::new("a.v2", "a", "img:2", "2.0.0"),
            ],
            others: vec![],
        }
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(ModelValidator::new().validate(&base_config()), Ok(()));
    }

    #[test]
    fn test_two_heads_rejected() {
        let mut cfg = base_config();
        cfg.channels[0].entries[1].replaces = None;
        let err = ModelValidator::new().validate(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::HeadCount { ref heads, .. } if heads.len() == 2));
    }

    #[test]
    fn test_self_skip_rejected() {
        let mut cfg = base_config();
        cfg.channels[0].entries[1].skips.insert("a.v2".to_string());
        let err = ModelValidator::new().validate(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::SelfReference { .. }));
    }

    #[test]
    fn test_missing_bundle_rejected() {
        let mut cfg = base_config();
        cfg.channels[0].push(ChannelEntry::new("a.v3").with_replaces("a.v2"));
        let err = ModelValidator::new().validate(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::MissingBundle { ref entry, .. } if entry == "a.v3"));
    }

    #[test]
    fn test_unknown_default_channel_rejected() {
        let mut cfg = base_config();
        cfg.packages[0].default_channel = Some("fast".to_string());
        let err = ModelValidator::new().validate(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDefaultChannel { .. }));
    }

    #[test]
    fn test_replaces_cycle_rejected() {
        let mut cfg = base_config();
        cfg.bundles.push(Bundle::new("a.v3", "a", "img:3", "3.0.0"));
        // v1 -> v3 -> v1 loop plus v2 head replacing v1
        cfg.channels[0].entries[0].replaces = Some("a.v3".to_string());
        cfg.channels[0].push(ChannelEntry::new("a.v3").with_replaces("a.v1"));
        let err = ModelValidator::new().validate(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::ReplacesCycle { .. }));
    }
}
