//! Core data types used throughout the treesync library
//!
//! This module contains the identifiers and records shared by the variant
//! trees, the synchronization classifier and the diff builder.
//!
//! ## Overview
//!
//! - **Identifiers**: `ContentId`, `CommitId`, `SnapshotId`
//! - **Paths**: `RepoPath`, a normalised slash-separated repository path
//! - **Variants**: `Variant`, `EntryKind` - one entry under a snapshot's scope
//! - **History**: `AncestryChain`, `CommitInfo`
//! - **Results**: `SyncStatus`, `Direction`, `ChangeKind`, `TypedElement`,
//!   `MergeState`
//!
//! ## Examples
//!
//! ```rust
//! use treesync::types::{ChangeKind, ContentId, RepoPath, SyncStatus, Variant};
//!
//! let path = RepoPath::new("src//main.rs/");
//! assert_eq!(path.as_str(), "src/main.rs");
//!
//! let variant = Variant::blob(path, ContentId::of(b"fn main() {}"));
//! assert!(variant.is_blob());
//!
//! let status = SyncStatus::outgoing(ChangeKind::Change);
//! assert!(!status.is_in_sync());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path};

use crate::error::{Result, TreeSyncError};

/// Content identifier of a blob
///
/// The hex-encoded SHA-256 of the blob content. Two blobs with the same
/// content always share one id, which is what makes comparisons cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    /// Compute the content id of a byte slice
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already computed hex digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form (first 8 characters)
    pub fn short(&self) -> &str {
        self.0.char_indices().nth(8).map_or(&self.0[..], |(i, _)| &self.0[..i])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commit identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    /// Wrap a commit id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form (first 8 characters)
    pub fn short(&self) -> &str {
        self.0.char_indices().nth(8).map_or(&self.0[..], |(i, _)| &self.0[..i])
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of one revision's root tree
///
/// Snapshots are immutable once obtained. The index and the working tree are
/// snapshots too; only commit snapshots have a history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SnapshotId {
    /// The tree of a commit
    Commit(CommitId),
    /// The staging area, including unresolved merge stages
    Index,
    /// The local working copy
    WorkingTree,
    /// A standalone named tree with no history (e.g. a scanned directory)
    Detached(String),
}

impl SnapshotId {
    /// The commit behind this snapshot, if any
    pub fn commit(&self) -> Option<&CommitId> {
        match self {
            SnapshotId::Commit(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotId::Commit(id) => write!(f, "{}", id.short()),
            SnapshotId::Index => write!(f, "INDEX"),
            SnapshotId::WorkingTree => write!(f, "WORKTREE"),
            SnapshotId::Detached(name) => write!(f, "{}", name),
        }
    }
}

/// Repository-relative path with `/` separators
///
/// Always normalised: no leading, trailing or doubled separators. The empty
/// path is the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RepoPath(String);

impl RepoPath {
    /// Normalise a slash-separated path
    pub fn new(path: &str) -> Self {
        let normalised = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalised)
    }

    /// The repository root
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Convert a relative file system path
    ///
    /// Fails for absolute paths and paths escaping the root with `..`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(TreeSyncError::InvalidPath(path.to_path_buf())),
            }
        }
        Ok(Self(segments.join("/")))
    }

    /// The path as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the repository root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments, root-first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Last segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent path (the root is its own parent)
    pub fn parent(&self) -> RepoPath {
        match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        }
    }

    /// Append a path below this one
    pub fn join(&self, child: &str) -> RepoPath {
        if self.is_root() {
            Self::new(child)
        } else {
            Self::new(&format!("{}/{}", self.0, child))
        }
    }

    /// Segment-wise prefix test; every path starts with the root
    pub fn starts_with(&self, prefix: &RepoPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for RepoPath {
    fn from(path: &str) -> Self {
        RepoPath::new(path)
    }
}

/// Kind of entry a variant describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A file
    Blob,
    /// A directory
    Folder,
}

/// One entry under a snapshot's scope
///
/// Folders carry no content id: no single content id exists for a directory
/// in this model, so folders compare by path instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Repository path of the entry
    pub path: RepoPath,
    /// Blob or folder
    pub kind: EntryKind,
    /// Content id (blobs only)
    pub content_id: Option<ContentId>,
}

impl Variant {
    /// A blob variant
    pub fn blob(path: RepoPath, content_id: ContentId) -> Self {
        Self {
            path,
            kind: EntryKind::Blob,
            content_id: Some(content_id),
        }
    }

    /// A folder variant
    pub fn folder(path: RepoPath) -> Self {
        Self {
            path,
            kind: EntryKind::Folder,
            content_id: None,
        }
    }

    /// Whether this variant is a blob
    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }

    /// Whether this variant is a folder
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Identity test: same kind, same content id (folders: same path)
    pub fn is_identical(&self, other: &Variant) -> bool {
        match (self.kind, other.kind) {
            (EntryKind::Blob, EntryKind::Blob) => self.content_id == other.content_id,
            (EntryKind::Folder, EntryKind::Folder) => self.path == other.path,
            _ => false,
        }
    }
}

/// Commit ids that modified one path, most recent first
///
/// An empty chain is legal and means the path has no recorded history
/// (new, untracked, or a snapshot without commits).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AncestryChain(Vec<CommitId>);

impl AncestryChain {
    /// Wrap an ordered list of commit ids
    pub fn new(commits: Vec<CommitId>) -> Self {
        Self(commits)
    }

    /// An empty chain
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// The most recent commit touching the path
    pub fn head(&self) -> Option<&CommitId> {
        self.0.first()
    }

    /// Whether the chain mentions a commit anywhere
    pub fn contains(&self, commit: &CommitId) -> bool {
        self.0.iter().any(|c| c == commit)
    }

    /// Number of commits in the chain
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &CommitId> {
        self.0.iter()
    }
}

impl From<Vec<CommitId>> for AncestryChain {
    fn from(commits: Vec<CommitId>) -> Self {
        Self(commits)
    }
}

/// Commit metadata needed by history walks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit identifier
    pub id: CommitId,
    /// Parent commits, first parent first
    pub parents: Vec<CommitId>,
    /// Commit time
    pub time: DateTime<Utc>,
    /// Commit message
    pub message: String,
}

impl CommitInfo {
    /// The first parent, if any
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    /// Whether this is a merge commit
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Direction of a synchronization difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Local, base and remote agree
    InSync,
    /// The local side carries a change the remote lacks
    Outgoing,
    /// The remote carries a change the local side lacks
    Incoming,
    /// Both sides changed
    Conflicting,
}

/// Kind of change behind a non-in-sync status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The path was added
    Addition,
    /// The path's content changed
    Change,
    /// The path was removed
    Deletion,
}

/// Per-path synchronization status
///
/// `InSync` never carries a change kind; every other direction always does.
/// The constructors are the only way to build one, which keeps that pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncStatus {
    direction: Direction,
    change: Option<ChangeKind>,
}

impl SyncStatus {
    /// Local, base and remote agree
    pub fn in_sync() -> Self {
        Self { direction: Direction::InSync, change: None }
    }

    /// Outgoing change of the given kind
    pub fn outgoing(kind: ChangeKind) -> Self {
        Self { direction: Direction::Outgoing, change: Some(kind) }
    }

    /// Incoming change of the given kind
    pub fn incoming(kind: ChangeKind) -> Self {
        Self { direction: Direction::Incoming, change: Some(kind) }
    }

    /// Conflicting change of the given kind
    pub fn conflicting(kind: ChangeKind) -> Self {
        Self { direction: Direction::Conflicting, change: Some(kind) }
    }

    /// Direction of the difference
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Kind of change (`None` for in-sync)
    pub fn change(&self) -> Option<ChangeKind> {
        self.change
    }

    /// Whether local, base and remote agree
    pub fn is_in_sync(&self) -> bool {
        self.direction == Direction::InSync
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.change {
            None => write!(f, "{:?}", self.direction),
            Some(kind) => write!(f, "{:?}|{:?}", self.direction, kind),
        }
    }
}

/// Handle to one side of a diff node
///
/// The core never inspects the content; callers resolve it through
/// [`crate::store::SnapshotStore::open_blob`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedElement {
    snapshot: SnapshotId,
    path: RepoPath,
    content_id: ContentId,
}

impl TypedElement {
    /// Create a handle for a blob of a snapshot
    pub fn new(snapshot: SnapshotId, path: RepoPath, content_id: ContentId) -> Self {
        Self { snapshot, path, content_id }
    }

    /// Snapshot the element belongs to
    pub fn snapshot(&self) -> &SnapshotId {
        &self.snapshot
    }

    /// Repository path of the element
    pub fn path(&self) -> &RepoPath {
        &self.path
    }

    /// Content id to stream the blob with
    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }
}

/// Classification of a path in a conflict-aware comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeState {
    /// The index holds an unresolved (nonzero stage) entry
    Conflicting,
    /// Resolved in the index, but the working tree differs from HEAD
    AutoMerged,
}
