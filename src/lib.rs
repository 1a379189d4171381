//! # treesync - Hierarchical snapshot comparison and synchronization status
//!
//! A library for comparing content-addressed directory snapshots and for
//! classifying, per path, how a local copy relates to a remote one.
//!
//! ## Overview
//!
//! treesync answers two questions about snapshots of a repository (a commit,
//! the index, the working tree, or any standalone tree):
//!
//! - **What differs?** A [`DiffTreeBuilder`] walks two snapshots in lock-step
//!   and produces a folder tree of `Addition`, `Deletion` and `Change`
//!   leaves. In conflict-aware mode it walks the working tree, the index,
//!   `HEAD` and the other merge parent and reports unresolved and
//!   auto-merged paths instead.
//! - **Which way does it flow?** A [`Synchronizer`] classifies every path
//!   under a scope as `InSync`, `Outgoing`, `Incoming` or `Conflicting`
//!   relative to a base and a remote snapshot, using the ancestry chains of
//!   each path rather than a full merge-base computation.
//!
//! ## Architecture
//!
//! - **Snapshot stores**: the [`SnapshotStore`] trait resolves references,
//!   opens trees and blobs, and walks commit history. [`MemoryStore`] is the
//!   in-memory implementation.
//! - **Walks**: [`walk::TreeWalk`] is a k-way merge-join over sorted trees,
//!   restricted by a [`PathFilter`] and stopped by a [`CancellationToken`].
//! - **Variant trees**: the entries of one snapshot under a scope, with the
//!   ancestry chain of every blob, cached per `(scope, snapshot, depth)`.
//! - **Classifier**: a pure function from local, base and remote variants
//!   plus their chains to a [`types::SyncStatus`].
//! - **Diff trees**: owned [`DiffNode`] trees, collapsed so single-child
//!   folder chains read as `a/b/c`.
//!
//! ## Quick Start
//!
//! ```rust
//! use treesync::{DiffTreeBuilder, MemoryStore, SnapshotStore, SyncConfig, Synchronizer, PathFilter};
//! use treesync::types::{RepoPath, SnapshotId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let c1 = store.create_commit(&[], store.write_tree([("src/lib.rs", b"v1".as_slice())]), "c1");
//! let c2 = store.create_commit(&[c1.clone()], store.write_tree([("src/lib.rs", b"v2".as_slice())]), "c2");
//! store.set_working_tree(store.write_tree([("src/lib.rs", b"v1".as_slice())]));
//!
//! // Hierarchical diff between two commits
//! let root = DiffTreeBuilder::new(&store)
//!     .build_two_way(&SnapshotId::Commit(c1.clone()), &SnapshotId::Commit(c2.clone()))?;
//! assert_eq!(root.leaf_count(), 1);
//!
//! // Per-path synchronization status
//! let synchronizer = Synchronizer::new(&store, SyncConfig::default())?;
//! let report = synchronizer.synchronize(
//!     &SnapshotId::WorkingTree,
//!     &SnapshotId::Commit(c1),
//!     &SnapshotId::Commit(c2),
//!     &PathFilter::all(),
//! )?;
//! println!("{}", report.status_of(&RepoPath::new("src/lib.rs")).unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TreeSyncError>`. Failures while building
//! a variant tree or a diff tree abort the whole build; no partial result is
//! cached or returned. Cancellation surfaces as [`TreeSyncError::Cancelled`].
//! The classifier itself never fails.
//!
//! ## Module Organization
//!
//! - [`types`]: identifiers, paths, variants and result types
//! - [`tree`]: flat snapshot trees
//! - [`store`]: the snapshot store trait and the in-memory store
//! - [`history`]: path history and merge-base walks
//! - [`walk`]: lock-step tree walks and path filters
//! - [`ancestry`], [`variant`]: per-snapshot indexes
//! - [`classifier`]: the divergence heuristic
//! - [`diff`]: diff trees and the collapsing pass
//! - [`sync`]: synchronize runs and reports
//! - [`scope`]: selection to scope resolution
//! - [`worktree`]: scanning directories on disk
//! - [`config`]: configuration and ignore policy
//! - [`error`]: error types

pub mod ancestry;
pub mod cancel;
pub mod classifier;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod scope;
pub mod store;
pub mod sync;
pub mod tree;
pub mod types;
pub mod variant;
pub mod walk;
pub mod worktree;

// Re-export main types for convenience
pub use cancel::CancellationToken;
pub use classifier::{SyncClassifier, SyncInput};
pub use config::{IgnorePolicy, SyncConfig, SyncConfigBuilder};
pub use diff::{Collapser, DiffKind, DiffNode, DiffTreeBuilder, FolderNode, LeafNode};
pub use error::{Result, TreeSyncError};
pub use scope::Scope;
pub use store::{MemoryStore, SnapshotStore};
pub use sync::{SyncEntry, SyncReport, Synchronizer};
pub use tree::{Tree, TreeEntry};
pub use variant::{VariantCache, VariantTree};
pub use walk::PathFilter;
pub use worktree::WorkingTreeScanner;
