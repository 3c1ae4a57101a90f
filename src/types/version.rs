//! Bundle version extraction and ordering.
//!
//! ## Ordering
//!
//! Versions compare by semantic-version precedence: major, minor, patch,
//! then pre-release. Build metadata never participates; two versions that
//! differ only in build metadata are treated as equal.
//!
//! A [`CompositeVersion`] extends this with the optional `release`
//! qualifier of the `olm.package` property, which orders after the version.

use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;

use super::bundle::{Bundle, PackageProperty};

/// Error extracting a version from a bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Missing, duplicated, or malformed package property.
    #[error("Invalid version for bundle {bundle:?}: {reason}")]
    InvalidVersion {
        /// Offending bundle.
        bundle: String,
        /// What was wrong.
        reason: String,
    },
}

impl VersionError {
    fn invalid(bundle: &Bundle, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            bundle: bundle.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Read the single `olm.package` property of a bundle.
pub fn package_property(bundle: &Bundle) -> Result<PackageProperty, VersionError> {
    let mut props = bundle.package_properties();
    let prop = props
        .next()
        .ok_or_else(|| VersionError::invalid(bundle, "no olm.package property"))?;
    if props.next().is_some() {
        return Err(VersionError::invalid(bundle, "more than one olm.package property"));
    }
    serde_json::from_value(prop.value.clone())
        .map_err(|e| VersionError::invalid(bundle, format!("malformed olm.package property: {e}")))
}

/// Extract the semantic version of a bundle.
pub fn bundle_version(bundle: &Bundle) -> Result<Version, VersionError> {
    let prop = package_property(bundle)?;
    Version::parse(&prop.version)
        .map_err(|e| VersionError::invalid(bundle, format!("{:?}: {e}", prop.version)))
}

/// Copy of `version` without build metadata.
pub fn strip_build(version: &Version) -> Version {
    let mut stripped = version.clone();
    stripped.build = BuildMetadata::EMPTY;
    stripped
}

/// Compare by semver precedence, ignoring build metadata.
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Total order over a bundle's version and release qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeVersion {
    /// Version without build metadata.
    pub version: Version,
    /// Release qualifier, if any.
    pub release: Option<Prerelease>,
}

impl CompositeVersion {
    /// Compute the composite version of a bundle.
    pub fn from_bundle(bundle: &Bundle) -> Result<Self, VersionError> {
        let prop = package_property(bundle)?;
        let version = Version::parse(&prop.version)
            .map_err(|e| VersionError::invalid(bundle, format!("{:?}: {e}", prop.version)))?;
        let release = match prop.release.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(Prerelease::new(raw).map_err(|e| {
                VersionError::invalid(bundle, format!("malformed release {raw:?}: {e}"))
            })?),
        };
        Ok(Self {
            version: strip_build(&version),
            release,
        })
    }
}

impl PartialOrd for CompositeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompositeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Option orders None before Some, which is the release rule we want.
        // Prerelease::EMPTY never appears here, so its "empty is greatest"
        // rule does not interfere.
        cmp_precedence(&self.version, &other.version).then_with(|| self.release.cmp(&other.release))
    }
}

impl fmt::Display for CompositeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.release {
            Some(release) => write!(f, "{}~{}", self.version, release),
            None => write!(f, "{}", self.version),
        }
    }
}
