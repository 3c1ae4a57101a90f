//! Substitutes template: an existing catalog plus ordered substitutions.
//!
//! Each substitution is spliced into the output of the previous one, so a
//! chain `A → B → C` is written as two entries, `B` over `A` then `C` over
//! `B`.

pub mod splicer;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::document::{DeclarativeConfig, DocumentError, DocumentValidator, ModelValidator};
use crate::render::{BundleRenderer, RenderContext};

pub use splicer::{splice, splice_channel, SpliceError, Substitute};

/// Schema tag of substitutes templates.
pub const SCHEMA_SUBSTITUTES: &str = "olm.template.substitutes";

/// Error type for substitutes template rendering.
#[derive(Debug, thiserror::Error)]
pub enum SubstitutesError {
    /// The template entries are not a valid catalog.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// A substitution failed.
    #[error("Substitution {index} failed: {source}")]
    Splice {
        /// Position in the substitution list.
        index: usize,
        /// Underlying splice error.
        #[source]
        source: SpliceError,
    },
}

impl SubstitutesError {
    /// The splice error, if a substitution failed.
    pub fn splice_error(&self) -> Option<&SpliceError> {
        match self {
            Self::Splice { source, .. } => Some(source),
            Self::Document(_) => None,
        }
    }
}

/// Substitutes template input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstitutesTemplate {
    /// Catalog documents to start from.
    #[serde(default)]
    pub entries: Vec<Value>,
    /// Substitutions, applied in order.
    #[serde(default)]
    pub substitutions: Vec<Substitute>,
}

impl SubstitutesTemplate {
    /// Create a template over existing catalog documents.
    pub fn new(entries: Vec<Value>) -> Self {
        Self {
            entries,
            substitutions: Vec::new(),
        }
    }

    /// Append a substitution.
    pub fn with_substitution(mut self, name: impl Into<String>, base: impl Into<String>) -> Self {
        self.substitutions.push(Substitute::new(name, base));
        self
    }

    /// Render with the default model validator.
    pub async fn render<R>(
        &self,
        renderer: &R,
        ctx: &RenderContext,
    ) -> Result<DeclarativeConfig, SubstitutesError>
    where
        R: BundleRenderer + ?Sized,
    {
        self.render_with(renderer, ctx, &ModelValidator::new()).await
    }

    /// Render, validating each splice with `validator`.
    pub async fn render_with<R>(
        &self,
        renderer: &R,
        ctx: &RenderContext,
        validator: &dyn DocumentValidator,
    ) -> Result<DeclarativeConfig, SubstitutesError>
    where
        R: BundleRenderer + ?Sized,
    {
        let mut cfg = DeclarativeConfig::load_slice(&self.entries)?;
        for (index, substitute) in self.substitutions.iter().enumerate() {
            splice(&mut cfg, substitute, renderer, ctx, validator)
                .await
                .map_err(|source| SubstitutesError::Splice { index, source })?;
        }

        info!(
            entries = self.entries.len(),
            substitutions = self.substitutions.len(),
            bundles = cfg.bundles.len(),
            fingerprint = %cfg.fingerprint(),
            "Rendered substitutes template"
        );
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::InMemoryBundleRenderer;
    use crate::types::Bundle;

    const TEMPLATE: &str = r#"
entries:
  - schema: olm.package
    name: pkg
    defaultChannel: stable
  - schema: olm.channel
    name: stable
    package: pkg
    entries:
      - name: pkg-v1.0.0
  - schema: olm.bundle
    name: pkg-v1.0.0
    package: pkg
    image: quay.io/pkg:v1.0.0
    properties:
      - type: olm.package
        value:
          packageName: pkg
          version: 1.0.0
substitutions:
  - name: quay.io/pkg:v1.0.1
    base: pkg-v1.0.0
"#;

    #[tokio::test]
    async fn test_render_applies_substitutions() {
        let template: SubstitutesTemplate = serde_yaml::from_str(TEMPLATE).unwrap();
        let mut r = InMemoryBundleRenderer::new();
        r.add_bundle(Bundle::new("pkg-v1.0.1", "pkg", "quay.io/pkg:v1.0.1", "1.0.1"));

        let cfg = template.render(&r, &RenderContext::new()).await.unwrap();
        let channel = &cfg.channels[0];
        assert_eq!(channel.entries.len(), 2);
        assert!(channel.entry("pkg-v1.0.1").unwrap().skips.contains("pkg-v1.0.0"));
        assert_eq!(cfg.bundles.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_reports_substitution_index() {
        let template = SubstitutesTemplate::new(Vec::new()).with_substitution("img", "pkg-v1");
        let err = template
            .render(&InMemoryBundleRenderer::new(), &RenderContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubstitutesError::Splice { index: 0, .. }));
        assert_eq!(
            err.splice_error(),
            Some(&SpliceError::UnknownBase("pkg-v1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_entries_without_schema_rejected() {
        let template = SubstitutesTemplate::new(vec![serde_json::json!({"name": "x"})]);
        let err = template
            .render(&InMemoryBundleRenderer::new(), &RenderContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubstitutesError::Document(DocumentError::MissingSchema { index: 0 })));
    }
}
