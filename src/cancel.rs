//! Cooperative cancellation
//!
//! Walks are path-ordered, so stopping at any path boundary is safe: the
//! builder returns [`TreeSyncError::Cancelled`] and the caller discards
//! whatever was built so far.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TreeSyncError};

/// Shared cancellation flag
///
/// Cloning yields another handle to the same flag, so a UI thread can keep one
/// clone and hand the other to a background comparison.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with `Cancelled` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TreeSyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}
