//! Flat snapshot trees
//!
//! A [`Tree`] maps every blob path of a snapshot to its [`TreeEntry`]. Folders
//! are implied by path prefixes, so "does folder `a/b` exist" is a range query
//! over the sorted map rather than a separate record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::{ContentId, EntryKind, RepoPath, Variant};

/// One blob entry of a snapshot tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Content id of the blob
    pub content_id: ContentId,
    /// Index merge stage (0 = resolved); always 0 outside the index
    pub stage: u8,
}

impl TreeEntry {
    /// A resolved entry
    pub fn new(content_id: ContentId) -> Self {
        Self { content_id, stage: 0 }
    }

    /// An index entry with an explicit merge stage
    pub fn staged(content_id: ContentId, stage: u8) -> Self {
        Self { content_id, stage }
    }

    /// Whether the entry is an unresolved merge entry
    pub fn is_unmerged(&self) -> bool {
        self.stage != 0
    }
}

/// Sorted blob entries of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: BTreeMap<RepoPath, TreeEntry>,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(path, content)` pairs
    pub fn from_contents<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut tree = Self::new();
        for (path, content) in files {
            tree.insert(RepoPath::new(path), TreeEntry::new(ContentId::of(content)));
        }
        tree
    }

    /// Insert or replace the entry at `path`
    pub fn insert(&mut self, path: RepoPath, entry: TreeEntry) {
        self.entries.insert(path, entry);
    }

    /// Remove the entry at `path`
    pub fn remove(&mut self, path: &RepoPath) -> Option<TreeEntry> {
        self.entries.remove(path)
    }

    /// Blob entry at `path`
    pub fn get(&self, path: &RepoPath) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    /// Iterate all blob entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &TreeEntry)> {
        self.entries.iter()
    }

    /// Number of blob entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no blobs
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Blob entries at or below `prefix`
    pub fn entries_under<'a>(&'a self, prefix: &RepoPath) -> impl Iterator<Item = (&'a RepoPath, &'a TreeEntry)> + 'a {
        let textual = prefix.clone();
        let segmented = prefix.clone();
        self.entries
            .range::<RepoPath, _>((Bound::Included(prefix.clone()), Bound::Unbounded))
            .take_while(move |(path, _)| path.as_str().starts_with(textual.as_str()))
            .filter(move |(path, _)| path.starts_with(&segmented))
    }

    /// Whether some blob lives strictly below `path`
    pub fn is_folder(&self, path: &RepoPath) -> bool {
        if path.is_root() {
            return true;
        }
        self.entries_under(path).any(|(p, _)| p != path)
    }

    /// Kind of the entry at `path`, if it exists
    pub fn kind_of(&self, path: &RepoPath) -> Option<EntryKind> {
        if self.entries.contains_key(path) {
            Some(EntryKind::Blob)
        } else if self.is_folder(path) {
            Some(EntryKind::Folder)
        } else {
            None
        }
    }

    /// Variant describing `path`, if it exists
    pub fn variant_of(&self, path: &RepoPath) -> Option<Variant> {
        match self.entries.get(path) {
            Some(entry) => Some(Variant::blob(path.clone(), entry.content_id.clone())),
            None if self.is_folder(path) => Some(Variant::folder(path.clone())),
            None => None,
        }
    }
}

impl FromIterator<(RepoPath, TreeEntry)> for Tree {
    fn from_iter<I: IntoIterator<Item = (RepoPath, TreeEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
