//! Semver template: channel graphs derived from bundle versions alone.
//!
//! ## Pipeline
//!
//! ```text
//! images → render_all → classify → synthesize → link → DeclarativeConfig
//!                           ↓            ↓          ↓
//!                    BundleVersions  EntryTuples  replaces/skips
//! ```
//!
//! Rendering may run concurrently; everything after it is a synchronous
//! pass over owned data.

pub mod classifier;
pub mod synthesizer;
pub mod linker;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::DeclarativeConfig;
use crate::policy::{GenerationPolicy, PolicyError, RenderPolicy};
use crate::render::{render_all, BundleRenderer, RenderContext, RenderError};
use crate::types::{Archetype, Bundle, Package, StreamType, VersionError};

pub use classifier::{classify, BundleVersions};
pub use linker::{link, LinkAccumulator, Transition};
pub use synthesizer::{synthesize, EntryTuple, HighwaterChannel, SynthesizedChannels};

/// Schema tag of semver templates.
pub const SCHEMA_SEMVER: &str = "olm.semver";

/// Error type for semver template rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemverError {
    /// A bundle has no usable version.
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),
    /// Two bundles of one archetype differ only in build metadata.
    #[error(
        "Ambiguous version ordering in {archetype}: bundle {bundle:?} and {partner:?} \
         both have version {version} once build metadata is ignored"
    )]
    AmbiguousVersionOrdering {
        /// Archetype holding both bundles.
        archetype: Archetype,
        /// Offending bundle.
        bundle: String,
        /// Bundle it collides with.
        partner: String,
        /// Shared version without build metadata.
        version: String,
    },
    /// Generation switches and preference disagree.
    #[error(transparent)]
    SchemaMismatch(#[from] PolicyError),
    /// A bundle image could not be rendered.
    #[error(transparent)]
    RenderFailure(#[from] RenderError),
    /// Rendered bundles span more than one package.
    #[error("Bundle {bundle:?} belongs to package {found:?}, expected {expected:?}")]
    MixedPackages {
        /// Package of the first bundle.
        expected: String,
        /// Package of the offending bundle.
        found: String,
        /// Offending bundle.
        bundle: String,
    },
}

/// Image reference of one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRef {
    /// Bundle image reference.
    pub image: String,
}

/// Bundles listed under one archetype.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleList {
    /// Bundle references.
    #[serde(default)]
    pub bundles: Vec<BundleRef>,
}

/// Compact semver template input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemverTemplate {
    /// Generate one channel per major version.
    #[serde(default)]
    pub generate_major_channels: bool,
    /// Generate one channel per minor version.
    #[serde(default)]
    pub generate_minor_channels: bool,
    /// Stream type preferred for the default channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel_type_preference: Option<StreamType>,
    /// Candidate bundles.
    #[serde(default)]
    pub candidate: BundleList,
    /// Fast bundles.
    #[serde(default)]
    pub fast: BundleList,
    /// Stable bundles.
    #[serde(default)]
    pub stable: BundleList,
}

impl SemverTemplate {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable major channels.
    pub fn with_major_channels(mut self, enabled: bool) -> Self {
        self.generate_major_channels = enabled;
        self
    }

    /// Enable or disable minor channels.
    pub fn with_minor_channels(mut self, enabled: bool) -> Self {
        self.generate_minor_channels = enabled;
        self
    }

    /// Set the default channel type preference.
    pub fn with_preference(mut self, preference: StreamType) -> Self {
        self.default_channel_type_preference = Some(preference);
        self
    }

    /// Append bundle images to an archetype.
    pub fn with_bundles(
        mut self,
        archetype: Archetype,
        images: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let list = match archetype {
            Archetype::Candidate => &mut self.candidate,
            Archetype::Fast => &mut self.fast,
            Archetype::Stable => &mut self.stable,
        };
        list.bundles
            .extend(images.into_iter().map(|image| BundleRef { image: image.into() }));
        self
    }

    /// Bundle list for an archetype.
    pub fn bundles(&self, archetype: Archetype) -> &BundleList {
        match archetype {
            Archetype::Candidate => &self.candidate,
            Archetype::Fast => &self.fast,
            Archetype::Stable => &self.stable,
        }
    }

    /// Resolve the generation policy declared by this template.
    pub fn policy(&self) -> Result<GenerationPolicy, PolicyError> {
        GenerationPolicy::resolve(
            self.generate_major_channels,
            self.generate_minor_channels,
            self.default_channel_type_preference,
        )
    }

    /// Render the template into a fully linked catalog document.
    pub async fn render<R>(
        &self,
        renderer: &R,
        ctx: &RenderContext,
        render_policy: &RenderPolicy,
    ) -> Result<DeclarativeConfig, SemverError>
    where
        R: BundleRenderer + ?Sized,
    {
        let policy = self.policy()?;

        let images: BTreeSet<String> = Archetype::ALL
            .iter()
            .flat_map(|a| self.bundles(*a).bundles.iter().map(|b| b.image.clone()))
            .collect();
        let rendered: BTreeMap<String, Vec<Bundle>> =
            render_all(renderer, ctx, images.into_iter().collect(), render_policy)
                .await?
                .into_iter()
                .collect();

        let mut by_archetype: BTreeMap<Archetype, Vec<Bundle>> = BTreeMap::new();
        for archetype in Archetype::ALL {
            let list = by_archetype.entry(archetype).or_default();
            for bundle_ref in &self.bundles(archetype).bundles {
                if let Some(bundles) = rendered.get(&bundle_ref.image) {
                    list.extend(bundles.iter().cloned());
                }
            }
        }

        render_bundles(&by_archetype, &policy)
    }
}

/// Build a linked catalog from already-rendered bundles.
///
/// This is the synchronous core of [`SemverTemplate::render`].
pub fn render_bundles(
    by_archetype: &BTreeMap<Archetype, Vec<Bundle>>,
    policy: &GenerationPolicy,
) -> Result<DeclarativeConfig, SemverError> {
    let mut package: Option<&str> = None;
    for bundle in by_archetype.values().flatten() {
        match package {
            None => package = Some(bundle.package.as_str()),
            Some(expected) if expected != bundle.package => {
                return Err(SemverError::MixedPackages {
                    expected: expected.to_string(),
                    found: bundle.package.clone(),
                    bundle: bundle.name.clone(),
                });
            }
            Some(_) => {}
        }
    }

    let versions = classify(by_archetype)?;
    let Some(package) = package else {
        warn!("Semver template lists no bundles, producing an empty catalog");
        return Ok(DeclarativeConfig::new());
    };

    let synthesized = synthesize(package, &versions, policy);
    let default_channel = synthesized.highwater.as_ref().map(|h| h.name.clone());
    let channels = link(synthesized.channels, synthesized.entries);

    let bundles: BTreeMap<&str, &Bundle> = by_archetype
        .values()
        .flatten()
        .map(|b| (b.name.as_str(), b))
        .collect();

    let mut pkg = Package::new(package);
    pkg.default_channel = default_channel;
    let cfg = DeclarativeConfig {
        packages: vec![pkg],
        channels,
        bundles: bundles.into_values().cloned().collect(),
        others: Vec::new(),
    };

    info!(
        package,
        bundles = cfg.bundles.len(),
        channels = cfg.channels.len(),
        default_channel = ?cfg.packages[0].default_channel,
        policy_hash = %policy.params_hash(),
        fingerprint = %cfg.fingerprint(),
        "Rendered semver template"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::InMemoryBundleRenderer;

    fn renderer(package: &str, versions: &[&str]) -> InMemoryBundleRenderer {
        let mut r = InMemoryBundleRenderer::new();
        for v in versions {
            r.add_bundle(Bundle::new(
                format!("{package}-v{v}"),
                package,
                format!("quay.io/{package}:v{v}"),
                *v,
            ));
        }
        r
    }

    #[test]
    fn test_template_yaml_decoding() {
        let yaml = r#"
generateMajorChannels: true
generateMinorChannels: false
stable:
  bundles:
    - image: quay.io/a:v0.1.0
"#;
        let template: SemverTemplate = serde_yaml::from_str(yaml).unwrap();
        assert!(template.generate_major_channels);
        assert!(template.candidate.bundles.is_empty());
        assert_eq!(template.stable.bundles[0].image, "quay.io/a:v0.1.0");
        assert_eq!(template.default_channel_type_preference, None);
    }

    #[tokio::test]
    async fn test_render_sets_default_channel() {
        let r = renderer("a", &["0.1.0", "0.1.1"]);
        let template = SemverTemplate::new()
            .with_major_channels(true)
            .with_bundles(Archetype::Stable, ["quay.io/a:v0.1.0", "quay.io/a:v0.1.1"]);

        let cfg = template
            .render(&r, &RenderContext::new(), &RenderPolicy::default())
            .await
            .unwrap();
        assert_eq!(cfg.packages[0].name, "a");
        assert_eq!(cfg.packages[0].default_channel.as_deref(), Some("stable-v0"));
        assert_eq!(cfg.channels.len(), 1);
        assert_eq!(cfg.bundles.len(), 2);
    }

    #[tokio::test]
    async fn test_render_rejects_mixed_packages() {
        let mut r = renderer("a", &["0.1.0"]);
        r.add_bundle(Bundle::new("b-v0.2.0", "b", "quay.io/b:v0.2.0", "0.2.0"));
        let template = SemverTemplate::new()
            .with_bundles(Archetype::Stable, ["quay.io/a:v0.1.0", "quay.io/b:v0.2.0"]);

        let err = template
            .render(&r, &RenderContext::new(), &RenderPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SemverError::MixedPackages { ref bundle, .. } if bundle == "b-v0.2.0"));
    }

    #[tokio::test]
    async fn test_render_rejects_policy_conflict_before_rendering() {
        // No image is indexed: a render attempt would fail differently.
        let r = InMemoryBundleRenderer::new();
        let template = SemverTemplate::new()
            .with_major_channels(true)
            .with_minor_channels(true)
            .with_bundles(Archetype::Stable, ["quay.io/a:v0.1.0"]);

        let err = template
            .render(&r, &RenderContext::new(), &RenderPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SemverError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn test_render_failure_names_image() {
        let r = InMemoryBundleRenderer::new();
        let template = SemverTemplate::new().with_bundles(Archetype::Fast, ["quay.io/a:v9"]);
        let err = template
            .render(&r, &RenderContext::new(), &RenderPolicy::default())
            .await
            .unwrap_err();
        match err {
            SemverError::RenderFailure(e) => assert_eq!(e.image(), "quay.io/a:v9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_template_renders_empty_catalog() {
        let cfg = SemverTemplate::new()
            .render(&InMemoryBundleRenderer::new(), &RenderContext::new(), &RenderPolicy::default())
            .await
            .unwrap();
        assert_eq!(cfg, DeclarativeConfig::new());
    }
}
