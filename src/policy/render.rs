//! Bundle rendering policy.

use serde::{Deserialize, Serialize};

/// Default number of bundle renders allowed in flight.
pub const DEFAULT_MAX_CONCURRENT_RENDERS: usize = 8;

/// Controls how image references are rendered into bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPolicy {
    /// Maximum renders in flight during batch rendering.
    pub max_concurrent_renders: usize,
}

impl RenderPolicy {
    /// Create a policy. Concurrency is clamped to at least 1.
    pub fn new(max_concurrent_renders: usize) -> Self {
        Self {
            max_concurrent_renders: max_concurrent_renders.max(1),
        }
    }

    /// Render one image at a time.
    pub fn sequential() -> Self {
        Self::new(1)
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_RENDERS)
    }
}
