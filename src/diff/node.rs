//! Diff tree nodes

use serde::{Deserialize, Serialize};

use crate::types::{MergeState, TypedElement};

/// Kind of difference a leaf records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffKind {
    /// Identical on both sides; never present in a built tree
    NoChange,
    /// Present on the left only
    Addition,
    /// Present on the right only
    Deletion,
    /// Present on both sides with different content
    Change,
    /// Unresolved merge entry
    Conflict,
}

/// A node of the diff tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiffNode {
    /// Path grouping
    Folder(FolderNode),
    /// One differing blob
    Leaf(LeafNode),
}

impl DiffNode {
    /// Display name: the last segment, or a collapsed `a/b/c` chain
    pub fn name(&self) -> &str {
        match self {
            DiffNode::Folder(folder) => folder.name(),
            DiffNode::Leaf(leaf) => &leaf.name,
        }
    }

    /// Whether this node groups other nodes
    pub fn is_folder(&self) -> bool {
        matches!(self, DiffNode::Folder(_))
    }

    /// Child nodes in insertion order (empty for leaves)
    pub fn children(&self) -> &[DiffNode] {
        match self {
            DiffNode::Folder(folder) => folder.children(),
            DiffNode::Leaf(_) => &[],
        }
    }

    /// Kind of difference (`NoChange` for folders)
    pub fn kind(&self) -> DiffKind {
        match self {
            DiffNode::Folder(_) => DiffKind::NoChange,
            DiffNode::Leaf(leaf) => leaf.kind,
        }
    }

    /// Merge-base side of a conflict-aware leaf
    pub fn ancestor(&self) -> Option<&TypedElement> {
        self.as_leaf().and_then(|leaf| leaf.ancestor.as_ref())
    }

    /// Left side of a leaf
    pub fn left(&self) -> Option<&TypedElement> {
        self.as_leaf().and_then(|leaf| leaf.left.as_ref())
    }

    /// Right side of a leaf
    pub fn right(&self) -> Option<&TypedElement> {
        self.as_leaf().and_then(|leaf| leaf.right.as_ref())
    }

    /// The leaf, if this is one
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            DiffNode::Leaf(leaf) => Some(leaf),
            DiffNode::Folder(_) => None,
        }
    }

    /// The folder, if this is one
    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            DiffNode::Folder(folder) => Some(folder),
            DiffNode::Leaf(_) => None,
        }
    }
}

/// A differing blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafNode {
    /// File name
    pub name: String,
    /// Kind of difference
    pub kind: DiffKind,
    /// Merge-base element (conflict-aware mode only)
    pub ancestor: Option<TypedElement>,
    /// Left element
    pub left: Option<TypedElement>,
    /// Right element
    pub right: Option<TypedElement>,
    /// Merge classification (conflict-aware mode only)
    pub merge_state: Option<MergeState>,
}

impl LeafNode {
    /// A two-way leaf
    pub fn new(name: impl Into<String>, kind: DiffKind, left: Option<TypedElement>, right: Option<TypedElement>) -> Self {
        Self {
            name: name.into(),
            kind,
            ancestor: None,
            left,
            right,
            merge_state: None,
        }
    }

    /// Attach a merge-base element and merge classification
    pub fn with_merge(mut self, ancestor: Option<TypedElement>, state: MergeState) -> Self {
        self.ancestor = ancestor;
        self.merge_state = Some(state);
        self
    }
}

/// Pure path grouping, no sides of its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    name: String,
    is_container: bool,
    children: Vec<DiffNode>,
}

impl FolderNode {
    /// The unnamed root of a diff tree
    pub fn root() -> Self {
        Self::default()
    }

    /// A folder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_container: false,
            children: Vec::new(),
        }
    }

    /// Folder name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the folder
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Mark the folder as a configured container
    pub fn set_container(&mut self, container: bool) {
        self.is_container = container;
    }

    /// Whether the folder is a configured container
    pub fn is_container(&self) -> bool {
        self.is_container
    }

    /// Child nodes in insertion order
    pub fn children(&self) -> &[DiffNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<DiffNode> {
        &mut self.children
    }

    /// Take the children, dropping the folder
    pub fn into_children(self) -> Vec<DiffNode> {
        self.children
    }

    /// Whether the folder has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Attach `leaf` below the folder chain named by `segments`
    ///
    /// Folders are found or created segment by segment, so every folder name
    /// occurs once per parent. `container` is the depth of the segment to
    /// tag, if any.
    pub fn insert(&mut self, segments: &[&str], leaf: LeafNode, container: Option<usize>) {
        let Some((head, rest)) = segments.split_first() else {
            self.children.push(DiffNode::Leaf(leaf));
            return;
        };

        let existing = self
            .children
            .iter()
            .position(|child| child.is_folder() && child.name() == *head);
        let index = match existing {
            Some(index) => index,
            None => {
                self.children.push(DiffNode::Folder(FolderNode::new(*head)));
                self.children.len() - 1
            }
        };

        if let DiffNode::Folder(child) = &mut self.children[index] {
            if container == Some(0) {
                child.is_container = true;
            }
            child.insert(rest, leaf, container.and_then(|depth| depth.checked_sub(1)));
        }
    }

    /// Number of leaves below this folder
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                DiffNode::Folder(folder) => folder.leaf_count(),
                DiffNode::Leaf(_) => 1,
            })
            .sum()
    }

    /// Every leaf with its slash-joined path below this folder
    pub fn leaves(&self) -> Vec<(String, &LeafNode)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a LeafNode)>) {
        for child in &self.children {
            let path = if prefix.is_empty() {
                child.name().to_string()
            } else {
                format!("{}/{}", prefix, child.name())
            };
            match child {
                DiffNode::Folder(folder) => folder.collect_leaves(&path, out),
                DiffNode::Leaf(leaf) => out.push((path, leaf)),
            }
        }
    }

    /// Node at a slash-separated path of display names
    ///
    /// Collapsed folders match on their whole `a/b/c` name.
    pub fn find(&self, path: &str) -> Option<&DiffNode> {
        for child in &self.children {
            if child.name() == path {
                return Some(child);
            }
            if let DiffNode::Folder(folder) = child {
                let below = path
                    .strip_prefix(folder.name())
                    .and_then(|rest| rest.strip_prefix('/'));
                if let Some(found) = below.and_then(|rest| folder.find(rest)) {
                    return Some(found);
                }
            }
        }
        None
    }
}
