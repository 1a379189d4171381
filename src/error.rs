//! Error types for the treesync library
//!
//! Errors fall into two groups. The comparison taxonomy proper
//! (`SnapshotUnresolvable`, `ObjectUnreadable`, `Cancelled`, `AmbiguousScope`)
//! describes why a diff or synchronize run could not produce a result. The
//! remaining variants wrap failures from the ambient stack (I/O, JSON,
//! ignore-pattern compilation) so callers only ever match on one type.
//!
//! Construction-time failures abort the whole build: no partially built
//! variant tree or diff tree is ever returned alongside an error.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the treesync library
pub type Result<T> = std::result::Result<T, TreeSyncError>;

/// Main error type for all treesync operations
#[derive(Debug, Error)]
pub enum TreeSyncError {
    /// A revision reference could not be resolved to a snapshot
    #[error("Snapshot unresolvable: {0}")]
    SnapshotUnresolvable(String),

    /// A blob, tree or commit could not be read from the store
    #[error("Object unreadable: {id} ({reason})")]
    ObjectUnreadable {
        /// Identifier of the object that failed to load
        id: String,
        /// What went wrong
        reason: String,
    },

    /// The run was cancelled cooperatively; the partial result was discarded
    #[error("Operation cancelled")]
    Cancelled,

    /// The selected paths span more than one logically distinct root
    #[error("Ambiguous scope: {0}")]
    AmbiguousScope(String),

    /// I/O errors during working tree scanning or blob streaming
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the directory walker
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// Pattern parsing error
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A path could not be expressed as a repository-relative path
    #[error("Invalid path: {0:?}")]
    InvalidPath(PathBuf),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TreeSyncError {
    /// Create an object-unreadable error for the given object id
    pub fn unreadable(id: impl ToString, reason: impl Into<String>) -> Self {
        TreeSyncError::ObjectUnreadable {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        TreeSyncError::Internal(msg.into())
    }

    /// Whether this error is a cooperative cancellation
    ///
    /// Callers drop the in-progress result silently in this case instead of
    /// reporting a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TreeSyncError::Cancelled)
    }

    /// Check if this error is recoverable by retrying the same request
    ///
    /// `AmbiguousScope` is deliberately not recoverable: the caller has to
    /// re-scope the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TreeSyncError::Cancelled | TreeSyncError::Io(_))
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            TreeSyncError::SnapshotUnresolvable(reference) => {
                format!("Revision '{}' could not be resolved. Check that the branch or commit exists.", reference)
            }
            TreeSyncError::AmbiguousScope(detail) => {
                format!("The selection spans more than one repository ({}). Select resources from a single repository.", detail)
            }
            TreeSyncError::Cancelled => "The comparison was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}
