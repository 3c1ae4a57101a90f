//! Channel generation policy.
//!
//! Resolves the template's stream-type switches and default-channel
//! preference into a consistent policy before synthesis begins.
//!
//! ## Resolution Rules
//!
//! - Neither stream type enabled: minor channels are generated.
//! - Preference unset, one stream type enabled: the preference follows it.
//! - Preference unset, both enabled: rejected, the preference is required.
//! - Preference set to a disabled stream type: rejected.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::StreamType;

/// Error resolving a generation policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Generation switches and preference disagree.
    #[error("Schema mismatch: {reason}")]
    SchemaMismatch {
        /// Which rule was broken.
        reason: String,
    },
}

/// Resolved channel generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPolicy {
    /// Generate `<archetype>-v<major>` channels.
    pub major: bool,
    /// Generate `<archetype>-v<major>.<minor>` channels.
    pub minor: bool,
    /// Stream type that wins default-channel ties.
    pub preference: StreamType,
}

impl GenerationPolicy {
    /// Resolve template switches into a policy.
    pub fn resolve(
        generate_major: bool,
        generate_minor: bool,
        preference: Option<StreamType>,
    ) -> Result<Self, PolicyError> {
        let (major, minor) = if !generate_major && !generate_minor {
            (false, true)
        } else {
            (generate_major, generate_minor)
        };

        let preference = match preference {
            Some(pref) => {
                let enabled = match pref {
                    StreamType::Major => major,
                    StreamType::Minor => minor,
                };
                if !enabled {
                    return Err(PolicyError::SchemaMismatch {
                        reason: format!(
                            "default channel type preference {pref:?} requires generating {pref} channels"
                        ),
                    });
                }
                pref
            }
            None if major && minor => {
                return Err(PolicyError::SchemaMismatch {
                    reason: "default channel type preference is required when generating both major and minor channels"
                        .to_string(),
                });
            }
            None if major => StreamType::Major,
            None => StreamType::Minor,
        };

        Ok(Self {
            major,
            minor,
            preference,
        })
    }

    /// Whether channels of this stream type are generated.
    pub fn is_enabled(&self, stream: StreamType) -> bool {
        match stream {
            StreamType::Major => self.major,
            StreamType::Minor => self.minor,
        }
    }

    /// Enabled stream types in ascending priority order.
    pub fn enabled(&self) -> impl Iterator<Item = StreamType> + '_ {
        StreamType::ALL.into_iter().filter(|s| self.is_enabled(*s))
    }

    /// Hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            major: false,
            minor: true,
            preference: StreamType::Minor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_minor() {
        let policy = GenerationPolicy::resolve(false, false, None).unwrap();
        assert_eq!(policy, GenerationPolicy::default());
        assert_eq!(policy.enabled().collect::<Vec<_>>(), vec![StreamType::Minor]);
    }

    #[test]
    fn test_preference_follows_single_mode() {
        let policy = GenerationPolicy::resolve(true, false, None).unwrap();
        assert_eq!(policy.preference, StreamType::Major);
        assert!(!policy.is_enabled(StreamType::Minor));
    }

    #[test]
    fn test_both_modes_require_preference() {
        let err = GenerationPolicy::resolve(true, true, None).unwrap_err();
        assert!(matches!(err, PolicyError::SchemaMismatch { .. }));

        let policy = GenerationPolicy::resolve(true, true, Some(StreamType::Major)).unwrap();
        assert_eq!(
            policy.enabled().collect::<Vec<_>>(),
            vec![StreamType::Major, StreamType::Minor]
        );
    }

    #[test]
    fn test_preference_must_be_enabled() {
        assert!(GenerationPolicy::resolve(true, false, Some(StreamType::Minor)).is_err());
        // Minor is the implicit mode when nothing is enabled.
        assert!(GenerationPolicy::resolve(false, false, Some(StreamType::Major)).is_err());
        assert!(GenerationPolicy::resolve(false, false, Some(StreamType::Minor)).is_ok());
    }

    #[test]
    fn test_params_hash_changes() {
        let a = GenerationPolicy::resolve(true, true, Some(StreamType::Major)).unwrap();
        let b = GenerationPolicy::resolve(true, true, Some(StreamType::Minor)).unwrap();
        assert_eq!(a.params_hash(), a.params_hash());
        assert_ne!(a.params_hash(), b.params_hash());
    }
}
