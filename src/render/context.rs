//! Cancellation handle for bundle renders.

use std::sync::Arc;
use tokio::sync::watch;

/// Caller-owned cancellation context shared by every render it starts.
///
/// Cloning is cheap; all clones observe the same cancellation.
#[derive(Debug, Clone)]
pub struct RenderContext {
    cancelled: Arc<watch::Sender<bool>>,
}

impl RenderContext {
    /// Create a live context.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancelled: Arc::new(tx),
        }
    }

    /// Cancel every render using this context.
    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolve once the context is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}
