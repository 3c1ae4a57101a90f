//! Template dispatch.
//!
//! A template file carries a `schema` tag naming its kind. The tag is
//! resolved once, at decode time, into a closed [`Template`] enum; every
//! kind renders to a [`DeclarativeConfig`] through the same call.

use serde::{Deserialize, Serialize};

use crate::document::{DeclarativeConfig, DocumentError, OutputFormat};
use crate::policy::RenderPolicy;
use crate::render::{BundleRenderer, RenderContext};
use crate::semver::{SemverError, SemverTemplate};
use crate::substitutes::{SubstitutesError, SubstitutesTemplate};

/// Error type for template decoding and rendering.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template file could not be decoded.
    #[error("Invalid template: {0}")]
    Decode(String),
    /// Semver rendering failed.
    #[error(transparent)]
    Semver(#[from] SemverError),
    /// Substitutes rendering failed.
    #[error(transparent)]
    Substitutes(#[from] SubstitutesError),
    /// Output could not be written.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A template of any supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum Template {
    /// Channels synthesized from bundle versions.
    #[serde(rename = "olm.semver")]
    Semver(SemverTemplate),
    /// Substitutions spliced into an existing catalog.
    #[serde(rename = "olm.template.substitutes")]
    Substitutes(SubstitutesTemplate),
}

impl Template {
    /// Decode a template from YAML (JSON is accepted as a YAML subset).
    pub fn from_yaml_str(input: &str) -> Result<Self, TemplateError> {
        serde_yaml::from_str(input).map_err(|e| TemplateError::Decode(e.to_string()))
    }

    /// Decode a template from JSON.
    pub fn from_json_str(input: &str) -> Result<Self, TemplateError> {
        serde_json::from_str(input).map_err(|e| TemplateError::Decode(e.to_string()))
    }

    /// Schema tag of this template.
    pub fn schema(&self) -> &'static str {
        match self {
            Self::Semver(_) => crate::semver::SCHEMA_SEMVER,
            Self::Substitutes(_) => crate::substitutes::SCHEMA_SUBSTITUTES,
        }
    }

    /// Render the template into a catalog document.
    pub async fn render<R>(
        &self,
        renderer: &R,
        ctx: &RenderContext,
        policy: &RenderPolicy,
    ) -> Result<DeclarativeConfig, TemplateError>
    where
        R: BundleRenderer + ?Sized,
    {
        match self {
            Self::Semver(t) => Ok(t.render(renderer, ctx, policy).await?),
            Self::Substitutes(t) => Ok(t.render(renderer, ctx).await?),
        }
    }

    /// Render and serialize in one step.
    pub async fn render_to_string<R>(
        &self,
        renderer: &R,
        ctx: &RenderContext,
        policy: &RenderPolicy,
        format: OutputFormat,
    ) -> Result<String, TemplateError>
    where
        R: BundleRenderer + ?Sized,
    {
        let cfg = self.render(renderer, ctx, policy).await?;
        Ok(cfg.to_string_as(format)?)
    }
}
