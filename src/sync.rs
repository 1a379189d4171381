//! Synchronize runs
//!
//! A [`Synchronizer`] classifies every path of a scope against three
//! snapshots: the local copy, the common base and the remote. One run
//!
//! 1. builds (or reuses) the variant tree of each snapshot under the scope,
//!    including the ancestry chains of the base and remote blobs,
//! 2. collects the union of their paths, and
//! 3. classifies each path with the [`SyncClassifier`] in parallel.
//!
//! The result is a [`SyncReport`] in path order, serialisable as JSON.
//!
//! ## Example
//!
//! ```rust
//! use treesync::config::SyncConfig;
//! use treesync::store::MemoryStore;
//! use treesync::sync::Synchronizer;
//! use treesync::types::{ChangeKind, RepoPath, SnapshotId, SyncStatus};
//! use treesync::walk::PathFilter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let c1 = store.create_commit(&[], store.write_tree([("greeting.txt", b"hello".as_slice())]), "c1");
//! let c2 = store.create_commit(&[c1.clone()], store.write_tree([("greeting.txt", b"world".as_slice())]), "c2");
//! store.set_working_tree(store.write_tree([("greeting.txt", b"hello".as_slice())]));
//!
//! let synchronizer = Synchronizer::new(&store, SyncConfig::default())?;
//! let report = synchronizer.synchronize(
//!     &SnapshotId::WorkingTree,
//!     &SnapshotId::Commit(c1),
//!     &SnapshotId::Commit(c2),
//!     &PathFilter::all(),
//! )?;
//!
//! assert_eq!(
//!     report.status_of(&RepoPath::new("greeting.txt")),
//!     Some(SyncStatus::incoming(ChangeKind::Change))
//! );
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::cancel::CancellationToken;
use crate::classifier::{SyncClassifier, SyncInput};
use crate::config::SyncConfig;
use crate::error::{Result, TreeSyncError};
use crate::store::SnapshotStore;
use crate::types::{Direction, EntryKind, RepoPath, SnapshotId, SyncStatus};
use crate::variant::{VariantCache, VariantTree};
use crate::walk::PathFilter;

/// Status of one path in a synchronize run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Repository path
    pub path: RepoPath,
    /// Kind of the local entry, `None` when absent locally
    pub local_kind: Option<EntryKind>,
    /// Classification result
    pub status: SyncStatus,
}

/// Result of a synchronize run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Local snapshot
    pub local: SnapshotId,
    /// Base snapshot
    pub base: SnapshotId,
    /// Remote snapshot
    pub remote: SnapshotId,
    /// One entry per path under the scope, in path order
    pub entries: Vec<SyncEntry>,
    /// When the run finished
    pub generated_at: DateTime<Utc>,
}

impl SyncReport {
    /// Status of `path`, if it was classified
    pub fn status_of(&self, path: &RepoPath) -> Option<SyncStatus> {
        self.entries
            .binary_search_by(|entry| entry.path.cmp(path))
            .ok()
            .map(|index| self.entries[index].status)
    }

    /// Entries that are not in sync
    pub fn changes(&self) -> impl Iterator<Item = &SyncEntry> {
        self.entries.iter().filter(|entry| !entry.status.is_in_sync())
    }

    /// Number of entries with the given direction
    pub fn count(&self, direction: Direction) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status.direction() == direction)
            .count()
    }

    /// Whether every path is in sync
    pub fn is_in_sync(&self) -> bool {
        self.changes().next().is_none()
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Orchestrates synchronize runs against one store
///
/// Variant trees are cached for the lifetime of the synchronizer, so
/// repeated runs over the same snapshots only classify.
pub struct Synchronizer<'s, S: SnapshotStore + ?Sized> {
    store: &'s S,
    config: SyncConfig,
    classifier: SyncClassifier,
    cache: VariantCache,
    cancel: CancellationToken,
    pool: Option<rayon::ThreadPool>,
}

impl<'s, S: SnapshotStore + ?Sized> Synchronizer<'s, S> {
    /// Create a synchronizer, compiling the configured ignore policy
    pub fn new(store: &'s S, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let classifier = SyncClassifier::new(config.ignore_policy()?);
        let pool = if config.parallel_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel_workers)
                .build()
                .map_err(|e| TreeSyncError::internal(format!("failed to start worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            store,
            config,
            classifier,
            cache: VariantCache::new(),
            cancel: CancellationToken::new(),
            pool,
        })
    }

    /// Use a cancellation token shared with the caller
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The configuration in use
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The variant cache of this synchronizer
    pub fn cache(&self) -> &VariantCache {
        &self.cache
    }

    /// Classify every path under `scope`
    ///
    /// Builds (or reuses from the cache) the variant trees of the three
    /// snapshots, walks the union of their paths and asks the classifier for
    /// the status of each one. Folders above the scope roots are reported
    /// only as far as they lead to the scope. The three builds run in
    /// parallel on the configured worker pool.
    ///
    /// # Arguments
    ///
    /// * `local` - The snapshot being synchronized, usually the working tree
    /// * `base` - The snapshot `local` was last synchronized with
    /// * `remote` - The snapshot to synchronize against
    /// * `scope` - Paths to classify; [`PathFilter::all`] for everything
    ///
    /// # Returns
    ///
    /// A [`SyncReport`] with one entry per visited path, in path order.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - A snapshot cannot be resolved or opened
    /// - A commit needed for an ancestry chain is missing
    /// - The run is cancelled through the configured token
    ///
    /// No partial report is returned and no failed variant tree is cached.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treesync::{MemoryStore, PathFilter, SyncConfig, Synchronizer};
    /// use treesync::types::{RepoPath, SnapshotId};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = MemoryStore::new();
    /// let c1 = store.create_commit(&[], store.write_tree([("a.txt", b"1".as_slice())]), "c1");
    /// let c2 = store.create_commit(&[c1.clone()], store.write_tree([("a.txt", b"2".as_slice())]), "c2");
    /// store.set_working_tree(store.write_tree([("a.txt", b"1".as_slice())]));
    ///
    /// let synchronizer = Synchronizer::new(&store, SyncConfig::default())?;
    /// let report = synchronizer.synchronize(
    ///     &SnapshotId::WorkingTree,
    ///     &SnapshotId::Commit(c1),
    ///     &SnapshotId::Commit(c2),
    ///     &PathFilter::all(),
    /// )?;
    /// assert!(!report.is_in_sync());
    /// assert!(report.status_of(&RepoPath::new("a.txt")).is_some());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self))]
    pub fn synchronize(
        &self,
        local: &SnapshotId,
        base: &SnapshotId,
        remote: &SnapshotId,
        scope: &PathFilter,
    ) -> Result<SyncReport> {
        match &self.pool {
            Some(pool) => pool.install(|| self.run(local, base, remote, scope)),
            None => self.run(local, base, remote, scope),
        }
    }

    /// Resolve references through the store, then synchronize
    pub fn synchronize_refs(&self, local: &str, base: &str, remote: &str, scope: &PathFilter) -> Result<SyncReport> {
        let local = self.store.resolve(local)?;
        let base = self.store.resolve(base)?;
        let remote = self.store.resolve(remote)?;
        self.synchronize(&local, &base, &remote, scope)
    }

    fn run(&self, local: &SnapshotId, base: &SnapshotId, remote: &SnapshotId, scope: &PathFilter) -> Result<SyncReport> {
        let started = Instant::now();

        let (local_tree, (base_tree, remote_tree)) = rayon::join(
            || self.variants(local, scope),
            || rayon::join(|| self.variants(base, scope), || self.variants(remote, scope)),
        );
        let (local_tree, base_tree, remote_tree) = (local_tree?, base_tree?, remote_tree?);

        let paths: Vec<&RepoPath> = local_tree
            .paths()
            .chain(base_tree.paths())
            .chain(remote_tree.paths())
            .filter(|path| !path.is_root())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        debug!("Classifying {} paths", paths.len());

        let entries = paths
            .par_iter()
            .map(|&path| -> Result<SyncEntry> {
                self.cancel.check()?;
                let local = local_tree.variant_of(path);
                let base_chain = base_tree.chain_of(path);
                let remote_chain = remote_tree.chain_of(path);
                let status = self.classifier.classify(&SyncInput {
                    path,
                    local,
                    base: base_tree.variant_of(path),
                    remote: remote_tree.variant_of(path),
                    base_chain: &base_chain,
                    remote_chain: &remote_chain,
                });
                Ok(SyncEntry {
                    path: path.clone(),
                    local_kind: local.map(|variant| variant.kind),
                    status,
                })
            })
            .collect::<Result<Vec<SyncEntry>>>()?;

        let report = SyncReport {
            local: local.clone(),
            base: base.clone(),
            remote: remote.clone(),
            entries,
            generated_at: Utc::now(),
        };
        info!(
            "Synchronized {} paths in {:?}: {} outgoing, {} incoming, {} conflicting",
            report.entries.len(),
            started.elapsed(),
            report.count(Direction::Outgoing),
            report.count(Direction::Incoming),
            report.count(Direction::Conflicting)
        );
        Ok(report)
    }

    fn variants(&self, snapshot: &SnapshotId, scope: &PathFilter) -> Result<Arc<VariantTree>> {
        self.cache
            .get_or_build(self.store, snapshot, scope, self.config.max_ancestry_depth, &self.cancel)
    }
}
