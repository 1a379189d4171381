//! Snapshot stores
//!
//! [`SnapshotStore`] is the seam between the comparison engine and whatever
//! holds the repository data. It answers five questions: which snapshot a
//! reference names, what tree a snapshot has, what bytes a content id
//! carries, which commits touched a path and where two histories meet.
//!
//! [`MemoryStore`] is a complete in-memory implementation. It backs the test
//! suite and the `treesync` binary, which loads scanned directories into it
//! as detached snapshots.
//!
//! ## Concurrency
//!
//! Stores are `Send + Sync`: variant trees for the two sides of a comparison
//! are built in parallel and query the same store concurrently.
//!
//! - `DashMap` for blob content and detached trees
//! - `RwLock` for the commit graph, refs, index and working tree
//!
//! ## Example
//!
//! ```rust
//! use treesync::store::{MemoryStore, SnapshotStore};
//! use treesync::types::{RepoPath, SnapshotId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let tree = store.write_tree([("README.md", b"hello".as_slice())]);
//! let c1 = store.create_commit(&[], tree, "initial");
//! store.set_ref("HEAD", c1.clone());
//!
//! let head = store.resolve("HEAD")?;
//! assert_eq!(head, SnapshotId::Commit(c1.clone()));
//!
//! let chain = store.ancestry_of(&RepoPath::new("README.md"), &c1)?;
//! assert_eq!(chain.head(), Some(&c1));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Result, TreeSyncError};
use crate::history;
use crate::tree::{Tree, TreeEntry};
use crate::types::{AncestryChain, CommitId, CommitInfo, ContentId, RepoPath, SnapshotId};

/// Reference name of the working tree snapshot
pub const WORKTREE_REF: &str = "WORKTREE";
/// Reference name of the index snapshot
pub const INDEX_REF: &str = "INDEX";
/// Reference name of the current commit
pub const HEAD_REF: &str = "HEAD";
/// Reference name of the commit being merged in
pub const MERGE_HEAD_REF: &str = "MERGE_HEAD";

/// Read access to snapshots, blobs and commit history
pub trait SnapshotStore: Send + Sync {
    /// Resolve a revision reference to a snapshot
    fn resolve(&self, reference: &str) -> Result<SnapshotId>;

    /// Root tree of a snapshot
    fn open_tree(&self, snapshot: &SnapshotId) -> Result<Arc<Tree>>;

    /// Stream a blob's content
    fn open_blob(&self, id: &ContentId) -> Result<Box<dyn Read + Send>>;

    /// Metadata of a commit
    fn commit_info(&self, id: &CommitId) -> Result<CommitInfo>;

    /// Commits that modified `path`, most recent first
    fn ancestry_of(&self, path: &RepoPath, tip: &CommitId) -> Result<AncestryChain> {
        self.ancestry_of_bounded(path, tip, 0)
    }

    /// Like [`SnapshotStore::ancestry_of`], returning at most `limit` commits
    /// (0 = unbounded)
    fn ancestry_of_bounded(&self, path: &RepoPath, tip: &CommitId, limit: usize) -> Result<AncestryChain> {
        history::path_history(self, path, tip, limit)
    }

    /// First commit reachable from both `a` and `b`
    fn merge_base_of(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>> {
        history::merge_base(self, a, b)
    }

    /// Read a blob fully into memory
    fn read_blob(&self, id: &ContentId) -> Result<Vec<u8>> {
        let mut reader = self.open_blob(id)?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| TreeSyncError::unreadable(id, e.to_string()))?;
        Ok(content)
    }
}

#[derive(Debug)]
struct StoredCommit {
    info: CommitInfo,
    tree: Arc<Tree>,
}

/// In-memory snapshot store
///
/// Commit times come from a logical clock that advances one second per
/// commit, so history walks are deterministic. Use
/// [`MemoryStore::create_commit_at`] to set times explicitly.
#[derive(Debug)]
pub struct MemoryStore {
    blobs: DashMap<ContentId, Arc<[u8]>>,
    commits: RwLock<HashMap<CommitId, StoredCommit>>,
    refs: RwLock<HashMap<String, CommitId>>,
    index: RwLock<Arc<Tree>>,
    working_tree: RwLock<Arc<Tree>>,
    detached: DashMap<String, Arc<Tree>>,
    clock: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            commits: RwLock::new(HashMap::new()),
            refs: RwLock::new(HashMap::new()),
            index: RwLock::new(Arc::new(Tree::new())),
            working_tree: RwLock::new(Arc::new(Tree::new())),
            detached: DashMap::new(),
            clock: AtomicI64::new(0),
        }
    }

    /// Store blob content, returning its id
    pub fn write_blob(&self, content: &[u8]) -> ContentId {
        let id = ContentId::of(content);
        self.blobs.entry(id.clone()).or_insert_with(|| Arc::from(content));
        trace!("Stored blob {} ({} bytes)", id.short(), content.len());
        id
    }

    /// Store every file's content and build the matching tree
    pub fn write_tree<'a>(&self, files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Tree {
        files
            .into_iter()
            .map(|(path, content)| (RepoPath::new(path), TreeEntry::new(self.write_blob(content))))
            .collect()
    }

    /// Record a commit with the next logical timestamp
    pub fn create_commit(&self, parents: &[CommitId], tree: Tree, message: &str) -> CommitId {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let time = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(tick);
        self.create_commit_at(parents, tree, message, time)
    }

    /// Record a commit with an explicit timestamp
    ///
    /// The commit id is derived from parents, time, message and tree content,
    /// so recording the same commit twice yields the same id.
    pub fn create_commit_at(&self, parents: &[CommitId], tree: Tree, message: &str, time: DateTime<Utc>) -> CommitId {
        let mut description = String::new();
        for parent in parents {
            description.push_str("parent ");
            description.push_str(parent.as_str());
            description.push('\n');
        }
        description.push_str(&format!("time {}\n", time.timestamp()));
        for (path, entry) in tree.iter() {
            description.push_str(&format!("{} {} {}\n", entry.stage, entry.content_id, path.as_str()));
        }
        description.push('\n');
        description.push_str(message);

        let id = CommitId::new(ContentId::of(description.as_bytes()).as_str());
        let info = CommitInfo {
            id: id.clone(),
            parents: parents.to_vec(),
            time,
            message: message.to_string(),
        };

        debug!("Created commit {} ({} parents, {} entries)", id.short(), parents.len(), tree.len());
        self.commits.write().insert(
            id.clone(),
            StoredCommit {
                info,
                tree: Arc::new(tree),
            },
        );
        id
    }

    /// Point a reference (e.g. `HEAD`, `MERGE_HEAD`, a branch) at a commit
    pub fn set_ref(&self, name: &str, commit: CommitId) {
        self.refs.write().insert(name.to_string(), commit);
    }

    /// Remove a reference
    pub fn remove_ref(&self, name: &str) -> Option<CommitId> {
        self.refs.write().remove(name)
    }

    /// Replace the index snapshot
    pub fn set_index(&self, tree: Tree) {
        *self.index.write() = Arc::new(tree);
    }

    /// Replace the working tree snapshot
    pub fn set_working_tree(&self, tree: Tree) {
        *self.working_tree.write() = Arc::new(tree);
    }

    /// Register a standalone tree under `name`
    pub fn insert_detached(&self, name: &str, tree: Tree) -> SnapshotId {
        self.detached.insert(name.to_string(), Arc::new(tree));
        SnapshotId::Detached(name.to_string())
    }

    /// Number of recorded commits
    pub fn commit_count(&self) -> usize {
        self.commits.read().len()
    }

    fn lookup_ref(&self, name: &str) -> Option<CommitId> {
        let refs = self.refs.read();
        refs.get(name)
            .or_else(|| refs.get(&format!("refs/heads/{}", name)))
            .cloned()
    }

    fn lookup_commit_prefix(&self, prefix: &str) -> Result<Option<CommitId>> {
        if prefix.len() < 4 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(None);
        }
        let commits = self.commits.read();
        let mut matches = commits.keys().filter(|id| id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(Some(id.clone())),
            (Some(_), Some(_)) => Err(TreeSyncError::SnapshotUnresolvable(format!(
                "{} (ambiguous commit prefix)",
                prefix
            ))),
            _ => Ok(None),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn resolve(&self, reference: &str) -> Result<SnapshotId> {
        match reference {
            WORKTREE_REF => return Ok(SnapshotId::WorkingTree),
            INDEX_REF => return Ok(SnapshotId::Index),
            _ => {}
        }
        if let Some(commit) = self.lookup_ref(reference) {
            return Ok(SnapshotId::Commit(commit));
        }
        if self.detached.contains_key(reference) {
            return Ok(SnapshotId::Detached(reference.to_string()));
        }
        if let Some(commit) = self.lookup_commit_prefix(reference)? {
            return Ok(SnapshotId::Commit(commit));
        }
        Err(TreeSyncError::SnapshotUnresolvable(reference.to_string()))
    }

    fn open_tree(&self, snapshot: &SnapshotId) -> Result<Arc<Tree>> {
        match snapshot {
            SnapshotId::Commit(id) => self
                .commits
                .read()
                .get(id)
                .map(|stored| Arc::clone(&stored.tree))
                .ok_or_else(|| TreeSyncError::unreadable(id, "commit not found")),
            SnapshotId::Index => Ok(self.index.read().clone()),
            SnapshotId::WorkingTree => Ok(self.working_tree.read().clone()),
            SnapshotId::Detached(name) => self
                .detached
                .get(name)
                .map(|tree| Arc::clone(tree.value()))
                .ok_or_else(|| TreeSyncError::SnapshotUnresolvable(name.clone())),
        }
    }

    fn open_blob(&self, id: &ContentId) -> Result<Box<dyn Read + Send>> {
        let content = self
            .blobs
            .get(id)
            .map(|blob| Arc::clone(blob.value()))
            .ok_or_else(|| TreeSyncError::unreadable(id, "blob not found"))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn commit_info(&self, id: &CommitId) -> Result<CommitInfo> {
        self.commits
            .read()
            .get(id)
            .map(|stored| stored.info.clone())
            .ok_or_else(|| TreeSyncError::unreadable(id, "commit not found"))
    }
}
