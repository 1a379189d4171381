//! Folder-chain collapsing
//!
//! ```text
//! before              after
//! /                   /
//! └── a               └── a/b/c
//!     └── b               ├── x
//!         └── c           └── y
//!             ├── x
//!             └── y
//! ```

use tracing::trace;

use super::node::{DiffNode, FolderNode};

/// Merges single-child folder chains into one folder
///
/// Runs bottom-up and depth-first. The root is never merged into its child,
/// so the root keeps representing the scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collapser;

impl Collapser {
    /// Collapse every chain below `root`, returning the number of merges
    pub fn collapse(root: &mut FolderNode) -> usize {
        let merged = root
            .children_mut()
            .iter_mut()
            .map(|child| match child {
                DiffNode::Folder(folder) => collapse_folder(folder),
                DiffNode::Leaf(_) => 0,
            })
            .sum();
        trace!("Collapsed {} folder links", merged);
        merged
    }
}

fn collapse_folder(folder: &mut FolderNode) -> usize {
    let mut merged: usize = folder
        .children_mut()
        .iter_mut()
        .map(|child| match child {
            DiffNode::Folder(inner) => collapse_folder(inner),
            DiffNode::Leaf(_) => 0,
        })
        .sum();

    while folder.children().len() == 1 && folder.children()[0].is_folder() {
        let Some(DiffNode::Folder(only)) = folder.children_mut().pop() else {
            break;
        };
        let name = format!("{}/{}", folder.name(), only.name());
        folder.set_name(name);
        if only.is_container() {
            folder.set_container(true);
        }
        *folder.children_mut() = only.into_children();
        merged += 1;
    }
    merged
}
