//! Variant trees: the entries of one snapshot under a scope
//!
//! A [`VariantTree`] is built with a single filtered walk of a snapshot's
//! tree. It records a [`Variant`] for every blob under the scope roots and
//! for every folder between a scope root and those blobs, and eagerly
//! computes the ancestry chain of every blob when the snapshot has a commit
//! tip. Once built it is read-only and can be shared between threads.
//!
//! [`VariantCache`] keeps one tree per `(scope, snapshot, max_depth)` key for the
//! lifetime of a run. A failed build caches nothing.
//!
//! ## Example
//!
//! ```rust
//! use treesync::store::MemoryStore;
//! use treesync::types::{RepoPath, SnapshotId};
//! use treesync::variant::VariantTree;
//! use treesync::walk::PathFilter;
//! use treesync::CancellationToken;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let tree = store.write_tree([("src/lib.rs", b"lib".as_slice()), ("src/main.rs", b"main".as_slice())]);
//! let head = store.create_commit(&[], tree, "initial");
//!
//! let variants = VariantTree::build(
//!     &store,
//!     &SnapshotId::Commit(head),
//!     &PathFilter::new(vec![RepoPath::new("src")]),
//!     0,
//!     &CancellationToken::new(),
//! )?;
//!
//! let src = variants.variant_of(&RepoPath::new("src")).unwrap();
//! assert_eq!(variants.members_of(src).len(), 2);
//! # Ok(())
//! # }
//! ```

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, trace};

use crate::ancestry::AncestryIndex;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::store::SnapshotStore;
use crate::types::{AncestryChain, RepoPath, SnapshotId, Variant};
use crate::walk::{PathFilter, TreeWalk};

/// Entries of one snapshot under a scope, with their ancestry
#[derive(Debug, Clone)]
pub struct VariantTree {
    snapshot: SnapshotId,
    scope: PathFilter,
    variants: BTreeMap<RepoPath, Variant>,
    ancestry: AncestryIndex,
}

impl VariantTree {
    /// Walk `snapshot` under `scope` and collect its variants
    ///
    /// Every blob under the scope becomes a variant, and every folder between
    /// a scope root and a blob becomes a folder variant. For commit snapshots
    /// the ancestry chain of every blob is computed eagerly and in parallel.
    ///
    /// # Arguments
    ///
    /// * `store` - The store holding the snapshot and its history
    /// * `snapshot` - The snapshot to index
    /// * `scope` - Paths to include
    /// * `max_depth` - Bound on each ancestry chain (0 = unbounded)
    /// * `cancel` - Checked before every walk step
    ///
    /// # Returns
    ///
    /// The variant tree. Snapshots without a commit tip (index, working
    /// tree, detached trees) get an empty ancestry index.
    ///
    /// # Errors
    ///
    /// The build fails as a whole if the snapshot cannot be opened, a history
    /// walk reaches a missing commit, or the token is cancelled.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treesync::{CancellationToken, MemoryStore, PathFilter, VariantTree};
    /// use treesync::types::{RepoPath, SnapshotId};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = MemoryStore::new();
    /// let c1 = store.create_commit(&[], store.write_tree([("src/a.rs", b"a".as_slice())]), "c1");
    ///
    /// let tree = VariantTree::build(
    ///     &store,
    ///     &SnapshotId::Commit(c1.clone()),
    ///     &PathFilter::new(vec![RepoPath::new("src")]),
    ///     0,
    ///     &CancellationToken::new(),
    /// )?;
    /// assert!(tree.variant_of(&RepoPath::new("src")).is_some());
    /// assert_eq!(tree.chain_of(&RepoPath::new("src/a.rs")).head(), Some(&c1));
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(store, cancel))]
    pub fn build<S>(
        store: &S,
        snapshot: &SnapshotId,
        scope: &PathFilter,
        max_depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Self>
    where
        S: SnapshotStore + ?Sized,
    {
        let started = Instant::now();
        let tree = store.open_tree(snapshot)?;

        let mut variants = BTreeMap::new();
        let mut blobs = Vec::new();
        for step in TreeWalk::new(&[tree.as_ref()], scope, cancel) {
            let step = step?;
            let Some(entry) = step.entry(0) else {
                continue;
            };

            let mut folder = step.path.parent();
            while scope.matches(&folder) && !variants.contains_key(&folder) {
                variants.insert(folder.clone(), Variant::folder(folder.clone()));
                if folder.is_root() {
                    break;
                }
                folder = folder.parent();
            }

            variants.insert(step.path.clone(), Variant::blob(step.path.clone(), entry.content_id.clone()));
            blobs.push(step.path.clone());
        }

        let ancestry = match snapshot.commit() {
            Some(tip) => AncestryIndex::build(store, tip, &blobs, max_depth, cancel)?,
            None => AncestryIndex::empty(),
        };

        debug!(
            "Built variant tree for {} ({} variants, {} blobs) in {:?}",
            snapshot,
            variants.len(),
            blobs.len(),
            started.elapsed()
        );

        Ok(Self {
            snapshot: snapshot.clone(),
            scope: scope.clone(),
            variants,
            ancestry,
        })
    }

    /// Snapshot the tree was built from
    pub fn snapshot(&self) -> &SnapshotId {
        &self.snapshot
    }

    /// Scope the tree was built for
    pub fn scope(&self) -> &PathFilter {
        &self.scope
    }

    /// Variant at `path`, if it exists under the scope
    pub fn variant_of(&self, path: &RepoPath) -> Option<&Variant> {
        self.variants.get(path)
    }

    /// Direct members of a folder variant, in path order
    ///
    /// Blobs have no members.
    pub fn members_of(&self, folder: &Variant) -> Vec<Variant> {
        if !folder.is_folder() {
            return Vec::new();
        }
        let prefix = &folder.path;
        self.variants
            .range::<RepoPath, _>((Bound::Excluded(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.as_str().starts_with(prefix.as_str()))
            .filter(|(path, _)| path.parent() == *prefix)
            .map(|(_, variant)| variant.clone())
            .collect()
    }

    /// Ancestry chain of `path` (empty for snapshots without history)
    pub fn chain_of(&self, path: &RepoPath) -> AncestryChain {
        self.ancestry.chain_of(path)
    }

    /// The ancestry index of the tree's blobs
    pub fn ancestry(&self) -> &AncestryIndex {
        &self.ancestry
    }

    /// Every path with a variant, in path order
    pub fn paths(&self) -> impl Iterator<Item = &RepoPath> {
        self.variants.keys()
    }

    /// Number of variants (blobs and folders)
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the scope holds nothing in this snapshot
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Variant trees of one run, keyed by scope, snapshot and ancestry depth
#[derive(Debug, Default)]
pub struct VariantCache {
    trees: DashMap<(PathFilter, SnapshotId, usize), Arc<VariantTree>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl VariantCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tree for `(scope, snapshot, max_depth)`, building it on first use
    pub fn get_or_build<S>(
        &self,
        store: &S,
        snapshot: &SnapshotId,
        scope: &PathFilter,
        max_depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Arc<VariantTree>>
    where
        S: SnapshotStore + ?Sized,
    {
        let key = (scope.clone(), snapshot.clone(), max_depth);
        if let Some(tree) = self.trees.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("Variant cache hit for {}", snapshot);
            return Ok(Arc::clone(tree.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!("Variant cache miss for {}", snapshot);
        let built = Arc::new(VariantTree::build(store, snapshot, scope, max_depth, cancel)?);
        let cached = self.trees.entry(key).or_insert(built);
        Ok(Arc::clone(cached.value()))
    }

    /// Number of cached trees
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// `(hits, misses)` since creation
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Drop every cached tree
    pub fn clear(&self) {
        self.trees.clear();
    }
}
