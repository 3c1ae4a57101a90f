//! In-memory bundle renderer.
//!
//! Serves pre-rendered bundles by image reference. Used in tests and by
//! the `render_template` binary, which loads its index from a catalog file.

use std::collections::BTreeMap;
use async_trait::async_trait;

use crate::document::DeclarativeConfig;
use crate::types::Bundle;
use super::BundleRenderer;

/// Error type for in-memory renderer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// No bundle is indexed under this image reference.
    #[error("Image not found: {0}")]
    ImageNotFound(String),
}

/// In-memory bundle renderer.
///
/// Uses BTreeMap for deterministic iteration order. An image may map to
/// several bundles, or to none when registered with [`add_empty_image`].
///
/// [`add_empty_image`]: InMemoryBundleRenderer::add_empty_image
#[derive(Debug, Clone, Default)]
pub struct InMemoryBundleRenderer {
    /// Bundles by image reference.
    images: BTreeMap<String, Vec<Bundle>>,
}

impl InMemoryBundleRenderer {
    /// Create a new empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every bundle of a catalog by its image reference.
    pub fn from_config(cfg: &DeclarativeConfig) -> Self {
        let mut renderer = Self::new();
        for bundle in &cfg.bundles {
            renderer.add_bundle(bundle.clone());
        }
        renderer
    }

    /// Add a bundle under its own image reference.
    pub fn add_bundle(&mut self, bundle: Bundle) {
        self.images
            .entry(bundle.image.clone())
            .or_default()
            .push(bundle);
    }

    /// Register an image that renders to no bundles.
    pub fn add_empty_image(&mut self, image: impl Into<String>) {
        self.images.entry(image.into()).or_default();
    }

    /// Get number of indexed images.
    pub fn num_images(&self) -> usize {
        self.images.len()
    }
}

#[async_trait]
impl BundleRenderer for InMemoryBundleRenderer {
    type Error = InMemoryError;

    async fn render_bundle(&self, image: &str) -> Result<Vec<Bundle>, Self::Error> {
        self.images
            .get(image)
            .cloned()
            .ok_or_else(|| InMemoryError::ImageNotFound(image.to_string()))
    }
}
