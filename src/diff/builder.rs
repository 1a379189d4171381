//! Building diff trees from snapshot walks

use std::time::Instant;
use tracing::{debug, info, instrument, trace};

use super::collapse::Collapser;
use super::node::{DiffKind, FolderNode, LeafNode};
use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::error::{Result, TreeSyncError};
use crate::store::{SnapshotStore, HEAD_REF, MERGE_HEAD_REF};
use crate::tree::TreeEntry;
use crate::types::{CommitId, MergeState, RepoPath, SnapshotId, TypedElement};
use crate::walk::{PathFilter, TreeWalk};

/// Counters of the most recent build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Paths visited by the walk
    pub visited: usize,
    /// Leaves inserted into the tree
    pub leaves: usize,
    /// Folder links merged by the collapsing pass
    pub collapsed: usize,
}

/// Builds hierarchical diff trees
///
/// Each build walks the requested snapshots once, restricted by the path
/// filter, inserts one leaf per differing path and finishes with the
/// collapsing pass. A cancelled build returns [`TreeSyncError::Cancelled`]
/// and nothing else.
pub struct DiffTreeBuilder<'s, S: SnapshotStore + ?Sized> {
    store: &'s S,
    filter: PathFilter,
    containers: Vec<String>,
    cancel: CancellationToken,
    collapse: bool,
    stats: BuildStats,
}

impl<'s, S: SnapshotStore + ?Sized> DiffTreeBuilder<'s, S> {
    /// Create a builder over `store` comparing whole snapshots
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            filter: PathFilter::all(),
            containers: Vec::new(),
            cancel: CancellationToken::new(),
            collapse: true,
            stats: BuildStats::default(),
        }
    }

    /// Take container names from a configuration
    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.containers = config.containers.clone();
        self
    }

    /// Restrict builds to a path filter
    pub fn filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set container folder names
    pub fn containers(mut self, containers: Vec<String>) -> Self {
        self.containers = containers;
        self
    }

    /// Use a cancellation token shared with the caller
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enable or disable the collapsing pass (enabled by default)
    pub fn collapse(mut self, collapse: bool) -> Self {
        self.collapse = collapse;
        self
    }

    /// Counters of the most recent build
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Compare two snapshots
    ///
    /// Paths only on the left become `Addition` leaves, paths only on the
    /// right `Deletion` leaves and paths with different content `Change`
    /// leaves. Paths with equal content produce no node.
    ///
    /// # Arguments
    ///
    /// * `left` - The snapshot treated as the newer side
    /// * `right` - The snapshot compared against
    ///
    /// # Returns
    ///
    /// The root folder of the diff tree. It stands for the filter's scope and
    /// is never merged by the collapsing pass. [`DiffTreeBuilder::stats`]
    /// holds the counters of this build afterwards.
    ///
    /// # Errors
    ///
    /// - [`TreeSyncError::SnapshotUnresolvable`] if either snapshot is unknown
    /// - [`TreeSyncError::Cancelled`] if the token fires during the walk
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treesync::{DiffKind, DiffTreeBuilder, MemoryStore};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = MemoryStore::new();
    /// let left = store.insert_detached("left", store.write_tree([("a/b/c/x", b"1".as_slice())]));
    /// let right = store.insert_detached("right", store.write_tree([("a/b/c/x", b"2".as_slice())]));
    ///
    /// let root = DiffTreeBuilder::new(&store).build_two_way(&left, &right)?;
    /// assert_eq!(root.children()[0].name(), "a/b/c");
    /// assert_eq!(root.find("a/b/c/x").unwrap().kind(), DiffKind::Change);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self))]
    pub fn build_two_way(&mut self, left: &SnapshotId, right: &SnapshotId) -> Result<FolderNode> {
        let started = Instant::now();
        self.stats = BuildStats::default();

        let left_tree = self.store.open_tree(left)?;
        let right_tree = self.store.open_tree(right)?;

        let mut root = FolderNode::root();
        let mut walk = TreeWalk::new(&[left_tree.as_ref(), right_tree.as_ref()], &self.filter, &self.cancel);
        for step in walk.by_ref() {
            let step = step?;
            let element = |snapshot: &SnapshotId, entry: Option<&TreeEntry>| {
                entry.map(|e| TypedElement::new(snapshot.clone(), step.path.clone(), e.content_id.clone()))
            };

            let kind = match (step.entry(0), step.entry(1)) {
                (Some(_), None) => DiffKind::Addition,
                (None, Some(_)) => DiffKind::Deletion,
                (Some(l), Some(r)) if l.content_id != r.content_id => DiffKind::Change,
                _ => continue,
            };

            trace!("{:?} {}", kind, step.path);
            let leaf = LeafNode::new(
                step.path.file_name(),
                kind,
                element(left, step.entry(0)),
                element(right, step.entry(1)),
            );
            self.insert(&mut root, step.path, leaf);
        }
        self.stats.visited = walk.visited();

        self.finish(&mut root);
        info!(
            "Two-way diff {} .. {}: {} leaves from {} paths in {:?}",
            left,
            right,
            self.stats.leaves,
            self.stats.visited,
            started.elapsed()
        );
        Ok(root)
    }

    /// Compare the working tree against a merge in progress
    ///
    /// Walks the working tree, the index, `head` and `other` together.
    /// Paths with an unresolved index entry become `Conflict` leaves; paths
    /// resolved in the index whose working tree content differs from `head`
    /// become `Change` leaves marked auto-merged. `left` is the working tree
    /// element, `right` the element of `other` and `ancestor` the element of
    /// the merge base of `head` and `other`, when one exists and holds the
    /// path. Untracked working tree files produce no node.
    ///
    /// # Arguments
    ///
    /// * `head` - The commit the merge started from
    /// * `other` - The commit being merged in
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The working tree, the index or either commit cannot be opened
    /// - The merge-base walk reaches a missing commit
    /// - The build is cancelled
    #[instrument(skip(self))]
    pub fn build_conflict_aware(&mut self, head: &CommitId, other: &CommitId) -> Result<FolderNode> {
        let started = Instant::now();
        self.stats = BuildStats::default();

        let working_tree = self.store.open_tree(&SnapshotId::WorkingTree)?;
        let index = self.store.open_tree(&SnapshotId::Index)?;
        let head_tree = self.store.open_tree(&SnapshotId::Commit(head.clone()))?;
        let other_snapshot = SnapshotId::Commit(other.clone());
        let other_tree = self.store.open_tree(&other_snapshot)?;

        let base = match self.store.merge_base_of(head, other)? {
            Some(base) => {
                let snapshot = SnapshotId::Commit(base);
                let tree = self.store.open_tree(&snapshot)?;
                Some((snapshot, tree))
            }
            None => {
                debug!("No merge base for {} and {}", head.short(), other.short());
                None
            }
        };

        let mut root = FolderNode::root();
        let trees = [
            working_tree.as_ref(),
            index.as_ref(),
            head_tree.as_ref(),
            other_tree.as_ref(),
        ];
        let mut walk = TreeWalk::new(&trees, &self.filter, &self.cancel);
        for step in walk.by_ref() {
            let step = step?;
            let worktree_entry = step.entry(0);
            let index_entry = step.entry(1);
            let head_entry = step.entry(2);

            let unresolved = index_entry.is_some_and(TreeEntry::is_unmerged);
            // Untracked files have no index entry and are never auto-merged
            let resolved = index_entry.is_some_and(|e| !e.is_unmerged());
            let worktree_changed = worktree_entry.map(|e| &e.content_id) != head_entry.map(|e| &e.content_id);

            let (kind, state) = if unresolved {
                (DiffKind::Conflict, MergeState::Conflicting)
            } else if resolved && worktree_changed {
                (DiffKind::Change, MergeState::AutoMerged)
            } else {
                continue;
            };

            let ancestor = base.as_ref().and_then(|(snapshot, tree)| {
                tree.get(step.path)
                    .map(|e| TypedElement::new(snapshot.clone(), step.path.clone(), e.content_id.clone()))
            });
            let left = worktree_entry
                .map(|e| TypedElement::new(SnapshotId::WorkingTree, step.path.clone(), e.content_id.clone()));
            let right = step
                .entry(3)
                .map(|e| TypedElement::new(other_snapshot.clone(), step.path.clone(), e.content_id.clone()));

            trace!("{:?} {}", state, step.path);
            let leaf = LeafNode::new(step.path.file_name(), kind, left, right).with_merge(ancestor, state);
            self.insert(&mut root, step.path, leaf);
        }
        self.stats.visited = walk.visited();

        self.finish(&mut root);
        info!(
            "Conflict-aware diff {} + {}: {} leaves from {} paths in {:?}",
            head.short(),
            other.short(),
            self.stats.leaves,
            self.stats.visited,
            started.elapsed()
        );
        Ok(root)
    }

    /// Conflict-aware comparison for the store's `HEAD` and `MERGE_HEAD`
    ///
    /// # Errors
    ///
    /// Returns [`TreeSyncError::SnapshotUnresolvable`] when either reference
    /// is missing or does not name a commit, otherwise the errors of
    /// [`DiffTreeBuilder::build_conflict_aware`].
    pub fn build_merge_in_progress(&mut self) -> Result<FolderNode> {
        let head = self.resolve_commit(HEAD_REF)?;
        let other = self.resolve_commit(MERGE_HEAD_REF)?;
        self.build_conflict_aware(&head, &other)
    }

    fn resolve_commit(&self, reference: &str) -> Result<CommitId> {
        match self.store.resolve(reference)? {
            SnapshotId::Commit(id) => Ok(id),
            other => Err(TreeSyncError::SnapshotUnresolvable(format!(
                "{} resolves to {} which is not a commit",
                reference, other
            ))),
        }
    }

    fn insert(&mut self, root: &mut FolderNode, path: &RepoPath, leaf: LeafNode) {
        let parent = path.parent();
        let segments: Vec<&str> = parent.segments().collect();
        let container = segments
            .iter()
            .position(|segment| self.containers.iter().any(|c| c == segment));
        root.insert(&segments, leaf, container);
        self.stats.leaves += 1;
    }

    fn finish(&mut self, root: &mut FolderNode) {
        if self.collapse {
            self.stats.collapsed = Collapser::collapse(root);
        }
    }
}
