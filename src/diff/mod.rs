//! Hierarchical diff trees
//!
//! This module turns snapshot comparisons into a tree of [`DiffNode`]s that
//! mirrors the folder structure of the differing paths.
//!
//! ## Modes
//!
//! - **Two-way** ([`DiffTreeBuilder::build_two_way`]): left against right.
//!   Every differing blob becomes an `Addition`, `Deletion` or `Change` leaf.
//! - **Conflict-aware** ([`DiffTreeBuilder::build_conflict_aware`]): the
//!   working tree, the index, `HEAD` and the other merge parent are walked
//!   together. Unresolved index entries become `Conflict` leaves, resolved
//!   paths whose working tree content differs from `HEAD` become `Change`
//!   leaves marked auto-merged. Leaves carry the merge-base element as their
//!   ancestor when the path exists there.
//!
//! ## Tree shape
//!
//! Leaves hang below one folder node per path segment. Folder names are
//! unique within their parent and children keep walk order, which is sorted
//! path order. After the walk the [`Collapser`] merges chains of folders that
//! each hold a single folder, so `a/b/c/x` and `a/b/c/y` end up below one
//! folder named `a/b/c`. The root is an unnamed folder that represents the
//! compared scope and is never merged away.
//!
//! ## Example
//!
//! ```rust
//! use treesync::diff::{DiffKind, DiffTreeBuilder};
//! use treesync::store::MemoryStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let left = store.insert_detached("left", store.write_tree([("a/b/c/x", b"1".as_slice())]));
//! let right = store.insert_detached("right", store.write_tree([("a/b/c/x", b"2".as_slice())]));
//!
//! let root = DiffTreeBuilder::new(&store).build_two_way(&left, &right)?;
//! let folder = &root.children()[0];
//! assert_eq!(folder.name(), "a/b/c");
//! assert_eq!(folder.children()[0].kind(), DiffKind::Change);
//! # Ok(())
//! # }
//! ```

mod builder;
mod collapse;
mod node;

pub use builder::{BuildStats, DiffTreeBuilder};
pub use collapse::Collapser;
pub use node::{DiffKind, DiffNode, FolderNode, LeafNode};
