//! Lock-step walks over N snapshot trees
//!
//! [`TreeWalk`] is a k-way merge-join over the sorted blob paths of N trees
//! (N = 2 for two-way diffs, N = 4 for conflict-aware diffs, N = 1 when a
//! single variant tree is materialised). Each step yields one path together
//! with the entry each tree holds for it, or `None` where a tree lacks it.
//!
//! [`PathFilter`] restricts a walk to the caller's scope roots so only the
//! selected part of a potentially huge snapshot is ever visited.
//!
//! ```rust
//! use treesync::tree::Tree;
//! use treesync::walk::{PathFilter, TreeWalk};
//! use treesync::CancellationToken;
//!
//! let left = Tree::from_contents([("a.txt", b"1".as_slice()), ("b.txt", b"2".as_slice())]);
//! let right = Tree::from_contents([("b.txt", b"2".as_slice()), ("c.txt", b"3".as_slice())]);
//!
//! let walk = TreeWalk::new(&[&left, &right], &PathFilter::all(), &CancellationToken::new());
//! let paths: Vec<String> = walk.map(|e| e.unwrap().path.to_string()).collect();
//! assert_eq!(paths, vec!["a.txt", "b.txt", "c.txt"]);
//! ```

use std::iter::Peekable;
use std::vec::IntoIter;
use tracing::trace;

use crate::cancel::CancellationToken;
use crate::error::{Result, TreeSyncError};
use crate::tree::{Tree, TreeEntry};
use crate::types::RepoPath;

/// Restricts walks to a set of scope roots
///
/// An empty filter matches everything. Nested roots are folded into their
/// outermost ancestor when the filter is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathFilter {
    roots: Vec<RepoPath>,
}

impl PathFilter {
    /// A filter that matches every path
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter matching the given roots and everything below them
    pub fn new(paths: impl IntoIterator<Item = RepoPath>) -> Self {
        let mut candidates: Vec<RepoPath> = paths.into_iter().collect();
        if candidates.iter().any(RepoPath::is_root) {
            return Self::all();
        }
        candidates.sort();
        candidates.dedup();

        let mut roots: Vec<RepoPath> = Vec::with_capacity(candidates.len());
        for path in candidates {
            if !roots.iter().any(|root| path.starts_with(root)) {
                roots.retain(|root| !root.starts_with(&path));
                roots.push(path);
            }
        }
        Self { roots }
    }

    /// Whether the filter matches every path
    pub fn is_unrestricted(&self) -> bool {
        self.roots.is_empty()
    }

    /// The scope roots (empty when unrestricted)
    pub fn roots(&self) -> &[RepoPath] {
        &self.roots
    }

    /// Whether `path` lies at or below one of the roots
    pub fn matches(&self, path: &RepoPath) -> bool {
        self.is_unrestricted() || self.roots.iter().any(|root| path.starts_with(root))
    }

    /// Whether `path` is a root or an ancestor folder of one
    ///
    /// Used to decide whether a folder above the scope still has to be
    /// reported so its in-scope members are reachable.
    pub fn leads_to(&self, path: &RepoPath) -> bool {
        self.is_unrestricted() || self.roots.iter().any(|root| root.starts_with(path))
    }

    /// Blob entries of `tree` selected by this filter, in path order
    pub fn select<'t>(&self, tree: &'t Tree) -> Vec<(&'t RepoPath, &'t TreeEntry)> {
        if self.is_unrestricted() {
            return tree.iter().collect();
        }
        let mut selected: Vec<_> = self
            .roots
            .iter()
            .flat_map(|root| tree.entries_under(root).collect::<Vec<_>>())
            .collect();
        // Per-root ranges are not globally sorted ("a.b/x" sorts before "a/x").
        selected.sort_by(|a, b| a.0.cmp(b.0));
        selected
    }
}

/// One step of a lock-step walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry<'t> {
    /// Path visited in this step
    pub path: &'t RepoPath,
    /// Entry of each walked tree, in the order the trees were given
    pub entries: Vec<Option<&'t TreeEntry>>,
}

impl<'t> WalkEntry<'t> {
    /// Entry of the tree at position `index`
    pub fn entry(&self, index: usize) -> Option<&'t TreeEntry> {
        self.entries.get(index).copied().flatten()
    }
}

/// K-way merge-join over sorted trees
pub struct TreeWalk<'t> {
    cursors: Vec<Peekable<IntoIter<(&'t RepoPath, &'t TreeEntry)>>>,
    cancel: CancellationToken,
    visited: usize,
    done: bool,
}

impl<'t> TreeWalk<'t> {
    /// Start a walk over `trees`, restricted by `filter`
    pub fn new(trees: &[&'t Tree], filter: &PathFilter, cancel: &CancellationToken) -> Self {
        let cursors = trees
            .iter()
            .map(|tree| filter.select(tree).into_iter().peekable())
            .collect();
        Self {
            cursors,
            cancel: cancel.clone(),
            visited: 0,
            done: false,
        }
    }

    /// Number of paths visited so far
    pub fn visited(&self) -> usize {
        self.visited
    }
}

impl<'t> Iterator for TreeWalk<'t> {
    type Item = Result<WalkEntry<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.done = true;
            trace!("Walk cancelled after {} paths", self.visited);
            return Some(Err(TreeSyncError::Cancelled));
        }

        let next_path = self
            .cursors
            .iter_mut()
            .filter_map(|cursor| cursor.peek().map(|(path, _)| *path))
            .min();

        let Some(path) = next_path else {
            self.done = true;
            trace!("Walk finished after {} paths", self.visited);
            return None;
        };

        let entries = self
            .cursors
            .iter_mut()
            .map(|cursor| {
                let at_path = cursor.peek().is_some_and(|(candidate, _)| *candidate == path);
                if at_path {
                    cursor.next().map(|(_, entry)| entry)
                } else {
                    None
                }
            })
            .collect();

        self.visited += 1;
        Some(Ok(WalkEntry { path, entries }))
    }
}
