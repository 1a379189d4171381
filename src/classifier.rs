//! Per-path synchronization classification
//!
//! [`SyncClassifier`] decides, for one path, how the local copy relates to
//! a remote snapshot given their common base. It does not compute a merge
//! base. Instead it looks at the ancestry chains of the path on both sides:
//!
//! | local vs base | base vs remote | chains                          | direction     | change   |
//! |---------------|----------------|---------------------------------|---------------|----------|
//! | equal         | equal          | -                               | `InSync`      | -        |
//! | equal         | differ         | remote head found in base chain | `Outgoing`    | `Change` |
//! | equal         | differ         | base head found in remote chain | `Incoming`    | `Change` |
//! | equal         | differ         | neither                         | `Conflicting` | `Change` |
//! | differ        | -              | -                               | `Outgoing`    | `Change` |
//!
//! Type mismatches, additions and removals have their own rules (see
//! [`SyncClassifier::classify`]). The result is advisory: chain membership
//! is a cheap approximation of reachability and may disagree with a real
//! merge-base computation on histories with criss-cross merges.
//!
//! ```rust
//! use treesync::classifier::{SyncClassifier, SyncInput};
//! use treesync::types::{AncestryChain, ChangeKind, CommitId, ContentId, RepoPath, SyncStatus, Variant};
//!
//! let path = RepoPath::new("greeting.txt");
//! let hello = Variant::blob(path.clone(), ContentId::of(b"hello"));
//! let world = Variant::blob(path.clone(), ContentId::of(b"world"));
//! let base_chain = AncestryChain::new(vec![CommitId::new("c1")]);
//! let remote_chain = AncestryChain::new(vec![CommitId::new("c2"), CommitId::new("c1")]);
//!
//! let status = SyncClassifier::default().classify(&SyncInput {
//!     path: &path,
//!     local: Some(&hello),
//!     base: Some(&hello),
//!     remote: Some(&world),
//!     base_chain: &base_chain,
//!     remote_chain: &remote_chain,
//! });
//! assert_eq!(status, SyncStatus::incoming(ChangeKind::Change));
//! ```

use tracing::trace;

use crate::config::IgnorePolicy;
use crate::types::{AncestryChain, ChangeKind, EntryKind, RepoPath, SyncStatus, Variant};

/// Everything the classifier needs to know about one path
#[derive(Debug, Clone, Copy)]
pub struct SyncInput<'a> {
    /// Path being classified
    pub path: &'a RepoPath,
    /// Local entry, `None` when the path does not exist locally
    pub local: Option<&'a Variant>,
    /// Base entry
    pub base: Option<&'a Variant>,
    /// Remote entry
    pub remote: Option<&'a Variant>,
    /// Ancestry of the path in the base snapshot
    pub base_chain: &'a AncestryChain,
    /// Ancestry of the path in the remote snapshot
    pub remote_chain: &'a AncestryChain,
}

/// The divergence heuristic
///
/// Stateless apart from the ignore policy; safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct SyncClassifier {
    ignore: IgnorePolicy,
}

impl SyncClassifier {
    /// Create a classifier that treats ignored paths as in sync
    pub fn new(ignore: IgnorePolicy) -> Self {
        Self { ignore }
    }

    /// Classify one path
    ///
    /// Never fails. Missing or unrelated ancestry degrades to `Conflicting`.
    pub fn classify(&self, input: &SyncInput<'_>) -> SyncStatus {
        let status = self.decide(input);
        trace!("{} -> {}", input.path, status);
        status
    }

    fn decide(&self, input: &SyncInput<'_>) -> SyncStatus {
        if self.ignore.is_ignored(input.path) {
            return SyncStatus::in_sync();
        }

        let Some(local) = input.local else {
            return compare_three_way(input);
        };

        match (local.kind, input.remote.map(|remote| remote.kind)) {
            (EntryKind::Blob, Some(EntryKind::Blob)) => classify_blobs(input, local),
            (EntryKind::Blob, None) => {
                if same_content(Some(local), input.base) {
                    SyncStatus::outgoing(ChangeKind::Addition)
                } else {
                    SyncStatus::outgoing(ChangeKind::Change)
                }
            }
            (EntryKind::Blob, Some(EntryKind::Folder)) => SyncStatus::conflicting(ChangeKind::Change),
            (EntryKind::Folder, Some(EntryKind::Folder)) => {
                if input.base.is_none() {
                    SyncStatus::incoming(ChangeKind::Addition)
                } else {
                    compare_three_way(input)
                }
            }
            (EntryKind::Folder, None) => SyncStatus::outgoing(ChangeKind::Addition),
            (EntryKind::Folder, Some(EntryKind::Blob)) => SyncStatus::conflicting(ChangeKind::Change),
        }
    }
}

fn classify_blobs(input: &SyncInput<'_>, local: &Variant) -> SyncStatus {
    if !same_content(Some(local), input.base) {
        return SyncStatus::outgoing(ChangeKind::Change);
    }
    if same_content(input.base, input.remote) {
        return SyncStatus::in_sync();
    }

    let remote_head_known = input
        .remote_chain
        .head()
        .is_some_and(|head| input.base_chain.contains(head));
    if remote_head_known {
        return SyncStatus::outgoing(ChangeKind::Change);
    }

    let base_head_known = input
        .base_chain
        .head()
        .is_some_and(|head| input.remote_chain.contains(head));
    if base_head_known {
        return SyncStatus::incoming(ChangeKind::Change);
    }

    SyncStatus::conflicting(ChangeKind::Change)
}

/// Both present blobs with the same content id
fn same_content(a: Option<&Variant>, b: Option<&Variant>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.is_blob() && b.is_blob() && a.content_id == b.content_id,
        _ => false,
    }
}

/// Both absent, or both present and identical
fn same_variant(a: Option<&Variant>, b: Option<&Variant>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_identical(b),
        _ => false,
    }
}

fn compare_three_way(input: &SyncInput<'_>) -> SyncStatus {
    let identical = same_variant(input.local, input.base)
        && same_variant(input.base, input.remote)
        && same_variant(input.local, input.remote);
    if identical {
        SyncStatus::in_sync()
    } else {
        SyncStatus::conflicting(ChangeKind::Change)
    }
}
