//! Bundle rendering seam.
//!
//! Turning an image reference into bundle metadata means pulling and
//! inspecting an image, which this kernel leaves to a [`BundleRenderer`]
//! implementation. Every render runs under a [`RenderContext`]; cancelling
//! the context fails in-flight renders promptly with
//! [`RenderError::Cancelled`] before any graph is touched.

pub mod context;
pub mod memory;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::policy::RenderPolicy;
use crate::types::Bundle;

pub use context::RenderContext;
pub use memory::InMemoryBundleRenderer;

/// Trait for bundle rendering backends.
///
/// A single image reference may yield zero or more bundles.
#[async_trait]
pub trait BundleRenderer: Send + Sync {
    /// Error type for render operations.
    type Error: std::error::Error + Send + Sync;

    /// Render an image reference into bundles.
    async fn render_bundle(&self, image: &str) -> Result<Vec<Bundle>, Self::Error>;
}

/// Error type for render operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The renderer reported an error.
    #[error("Failed to render bundle image reference {image:?}: {reason}")]
    Failed {
        /// Image reference being rendered.
        image: String,
        /// Renderer error message.
        reason: String,
    },
    /// The caller cancelled the render.
    #[error("Render of bundle image reference {image:?} was cancelled")]
    Cancelled {
        /// Image reference being rendered.
        image: String,
    },
}

impl RenderError {
    /// Image reference the error concerns.
    pub fn image(&self) -> &str {
        match self {
            Self::Failed { image, .. } | Self::Cancelled { image } => image,
        }
    }

    /// Create a render error from any renderer error type.
    pub fn from_renderer<E: std::error::Error>(image: &str, e: E) -> Self {
        Self::Failed {
            image: image.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Render one image reference, honoring cancellation.
pub async fn render_one<R>(
    renderer: &R,
    ctx: &RenderContext,
    image: &str,
) -> Result<Vec<Bundle>, RenderError>
where
    R: BundleRenderer + ?Sized,
{
    let cancelled = || RenderError::Cancelled {
        image: image.to_string(),
    };
    if ctx.is_cancelled() {
        return Err(cancelled());
    }

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(cancelled()),
        result = renderer.render_bundle(image) => {
            let bundles = result.map_err(|e| RenderError::from_renderer(image, e))?;
            debug!(image, bundles = bundles.len(), "Rendered bundle image");
            Ok(bundles)
        }
    }
}

/// Render many image references with bounded concurrency.
///
/// Completion order is arbitrary; results are paired with their image
/// reference so callers can key them by name. The first failure aborts
/// the batch and drops the renders still in flight.
pub async fn render_all<R>(
    renderer: &R,
    ctx: &RenderContext,
    images: Vec<String>,
    policy: &RenderPolicy,
) -> Result<Vec<(String, Vec<Bundle>)>, RenderError>
where
    R: BundleRenderer + ?Sized,
{
    stream::iter(images.into_iter().map(|image| async move {
        let bundles = render_one(renderer, ctx, &image).await?;
        Ok::<_, RenderError>((image, bundles))
    }))
    .buffer_unordered(policy.max_concurrent_renders.max(1))
    .try_collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Renderer that never finishes.
    struct StalledRenderer;

    #[async_trait]
    impl BundleRenderer for StalledRenderer {
        type Error = std::io::Error;

        async fn render_bundle(&self, _image: &str) -> Result<Vec<Bundle>, Self::Error> {
            std::future::pending().await
        }
    }

    fn renderer() -> InMemoryBundleRenderer {
        let mut r = InMemoryBundleRenderer::new();
        for v in ["0.1.0", "0.1.1", "0.2.0"] {
            r.add_bundle(Bundle::new(format!("a-v{v}"), "a", format!("img:{v}"), v));
        }
        r
    }

    #[tokio::test]
    async fn test_render_one() {
        let ctx = RenderContext::new();
        let bundles = render_one(&renderer(), &ctx, "img:0.1.1").await.unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].name, "a-v0.1.1");
    }

    #[tokio::test]
    async fn test_render_failure_names_image() {
        let ctx = RenderContext::new();
        let err = render_one(&renderer(), &ctx, "img:9.9.9").await.unwrap_err();
        assert!(matches!(err, RenderError::Failed { .. }));
        assert_eq!(err.image(), "img:9.9.9");
    }

    #[tokio::test]
    async fn test_cancel_stops_stalled_render() {
        let ctx = RenderContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            render_one(&StalledRenderer, &ctx, "img:stalled"),
        )
        .await
        .expect("cancellation should be prompt")
        .unwrap_err();
        assert_eq!(err, RenderError::Cancelled { image: "img:stalled".to_string() });
    }

    #[tokio::test]
    async fn test_render_all_keys_by_image() {
        let ctx = RenderContext::new();
        let images = vec!["img:0.2.0".to_string(), "img:0.1.0".to_string(), "img:0.1.1".to_string()];
        let mut results = render_all(&renderer(), &ctx, images, &RenderPolicy::new(2))
            .await
            .unwrap();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        let names: Vec<_> = results.iter().map(|(_, b)| b[0].name.as_str()).collect();
        assert_eq!(names, vec!["a-v0.1.0", "a-v0.1.1", "a-v0.2.0"]);
    }

    #[tokio::test]
    async fn test_render_all_fails_on_first_error() {
        let ctx = RenderContext::new();
        let images = vec!["img:0.1.0".to_string(), "img:missing".to_string()];
        let err = render_all(&renderer(), &ctx, images, &RenderPolicy::sequential())
            .await
            .unwrap_err();
        assert_eq!(err.image(), "img:missing");
    }
}
