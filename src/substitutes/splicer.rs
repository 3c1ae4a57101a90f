//! Graph splicer.
//!
//! Inserts a substitute bundle in place of an existing base entry across
//! every channel of a catalog. The base stays in the graph as an edge-less
//! leaf that the substitute skips, so anything that could upgrade from the
//! base still can.
//!
//! ## Algorithm
//!
//! Per channel, two passes over an append-only entry list:
//!
//! 1. Collect the indices of base entries, then walk them backwards,
//!    appending a substitute entry that inherits the base's edges and
//!    clearing the base
//! 2. Rewrite edges of the entries that existed before pass 1: a
//!    `replaces` of the base moves to the substitute (keeping the base as a
//!    skip), a skip of the base becomes a skip of the substitute
//!
//! No rollback: a failure after pass 1 leaves the caller's document
//! mutated.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{DeclarativeConfig, DocumentValidator, ValidationError};
use crate::render::{render_one, BundleRenderer, RenderContext, RenderError};
use crate::types::{Bundle, Channel, ChannelEntry, CompositeVersion, VersionError};

/// A requested replacement: render `name`, put it where `base` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    /// Image reference of the replacement bundle.
    pub name: String,
    /// Name of the bundle being replaced.
    pub base: String,
}

impl Substitute {
    /// Create a substitution.
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
        }
    }
}

/// Error type for splicing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpliceError {
    /// The substitution request itself is malformed.
    #[error("Invalid substitution {name:?} for base {base:?}: {reason}")]
    InvalidSubstitution {
        /// Requested replacement.
        name: String,
        /// Requested base.
        base: String,
        /// Violated rule.
        reason: String,
    },
    /// The base bundle is not in the catalog.
    #[error("Base bundle {0:?} not found in catalog")]
    UnknownBase(String),
    /// Rendering the substitute failed or was cancelled.
    #[error(transparent)]
    RenderFailure(#[from] RenderError),
    /// The substitute image rendered no bundle.
    #[error("Substitute image {0:?} rendered no bundle")]
    EmptyRender(String),
    /// The substitute does not move past its base.
    #[error(
        "Substitute {substitute:?} ({substitute_version}) must have a higher version \
         than base {base:?} ({base_version})"
    )]
    NonMonotonicSubstitution {
        /// Base bundle name.
        base: String,
        /// Base composite version.
        base_version: String,
        /// Substitute bundle name.
        substitute: String,
        /// Substitute composite version.
        substitute_version: String,
    },
    /// Base or substitute has no usable version.
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),
    /// The spliced document failed validation.
    #[error("Spliced catalog is invalid: {0}")]
    ResultingGraphInvalid(#[from] ValidationError),
}

impl SpliceError {
    fn invalid(substitute: &Substitute, reason: impl Into<String>) -> Self {
        Self::InvalidSubstitution {
            name: substitute.name.clone(),
            base: substitute.base.clone(),
            reason: reason.into(),
        }
    }
}

/// Check the request shape before touching anything.
fn check_request(substitute: &Substitute) -> Result<(), SpliceError> {
    if substitute.name.is_empty() {
        return Err(SpliceError::invalid(substitute, "substitute name must not be empty"));
    }
    if substitute.base.is_empty() {
        return Err(SpliceError::invalid(substitute, "base name must not be empty"));
    }
    if substitute.name == substitute.base {
        return Err(SpliceError::invalid(substitute, "substitute and base must differ"));
    }
    Ok(())
}

/// Render the substitute image to exactly one bundle.
async fn render_substitute<R>(
    renderer: &R,
    ctx: &RenderContext,
    image: &str,
) -> Result<Bundle, SpliceError>
where
    R: BundleRenderer + ?Sized,
{
    let mut bundles = render_one(renderer, ctx, image).await?;
    match bundles.len() {
        0 => Err(SpliceError::EmptyRender(image.to_string())),
        1 => Ok(bundles.remove(0)),
        n => Err(RenderError::Failed {
            image: image.to_string(),
            reason: format!("expected exactly one bundle, rendered {n}"),
        }
        .into()),
    }
}

/// Splice one channel. Returns the number of base entries replaced.
pub fn splice_channel(channel: &mut Channel, base: &str, substitute: &str) -> usize {
    let original_len = channel.entries.len();
    let base_indices: Vec<usize> = channel
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.name == base)
        .map(|(i, _)| i)
        .collect();

    for &i in base_indices.iter().rev() {
        let base_entry = &mut channel.entries[i];
        let mut spliced = ChannelEntry {
            name: substitute.to_string(),
            replaces: base_entry.replaces.take(),
            skips: std::mem::take(&mut base_entry.skips),
            skip_range: base_entry.skip_range.take(),
        };
        spliced.skips.insert(base.to_string());
        channel.push(spliced);
    }

    for entry in &mut channel.entries[..original_len] {
        if entry.replaces.as_deref() == Some(base) {
            entry.replaces = Some(substitute.to_string());
            entry.skips.insert(base.to_string());
        } else if entry.skips.remove(base) {
            entry.skips.insert(substitute.to_string());
        }
    }

    base_indices.len()
}

/// Replace `substitute.base` with the bundle rendered from `substitute.name`.
///
/// The rendered bundle is appended to the catalog and the whole document
/// is re-validated. On error the document may already be mutated; callers
/// needing atomicity should splice a clone.
pub async fn splice<R>(
    cfg: &mut DeclarativeConfig,
    substitute: &Substitute,
    renderer: &R,
    ctx: &RenderContext,
    validator: &dyn DocumentValidator,
) -> Result<(), SpliceError>
where
    R: BundleRenderer + ?Sized,
{
    check_request(substitute)?;

    let base_bundle = cfg
        .bundle(&substitute.base)
        .ok_or_else(|| SpliceError::UnknownBase(substitute.base.clone()))?;
    let base_version = CompositeVersion::from_bundle(base_bundle)?;
    let base_package = base_bundle.package.clone();

    let bundle = render_substitute(renderer, ctx, &substitute.name).await?;
    if bundle.package != base_package {
        return Err(SpliceError::invalid(
            substitute,
            format!(
                "substitute bundle {:?} belongs to package {:?}, base belongs to {:?}",
                bundle.name, bundle.package, base_package
            ),
        ));
    }

    let substitute_version = CompositeVersion::from_bundle(&bundle)?;
    if base_version >= substitute_version {
        return Err(SpliceError::NonMonotonicSubstitution {
            base: substitute.base.clone(),
            base_version: base_version.to_string(),
            substitute: bundle.name.clone(),
            substitute_version: substitute_version.to_string(),
        });
    }

    let mut channels_touched = 0usize;
    for channel in cfg.channels.iter_mut().filter(|c| c.package == base_package) {
        let replaced = splice_channel(channel, &substitute.base, &bundle.name);
        if replaced > 0 {
            debug!(channel = %channel.name, replaced, "Spliced channel");
            channels_touched += 1;
        }
    }

    let name = bundle.name.clone();
    cfg.bundles.push(bundle);
    validator.validate(cfg)?;

    info!(
        base = %substitute.base,
        substitute = %name,
        %base_version,
        %substitute_version,
        channels_touched,
        fingerprint = %cfg.fingerprint(),
        "Spliced substitute"
    );
    Ok(())
}
