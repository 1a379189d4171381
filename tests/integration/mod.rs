//! Scenario tests for treesync
//!
//! Each test builds a small commit graph in a [`MemoryStore`] (or scans a
//! directory on disk) and checks the synchronization statuses or the diff
//! tree shape a user would see.

use ::treesync::types::{ChangeKind, CommitId, Direction, MergeState, RepoPath, SnapshotId, SyncStatus};
use ::treesync::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Commit graph helper over a memory store
pub struct ScenarioHarness {
    pub store: MemoryStore,
}

impl ScenarioHarness {
    pub fn new() -> Self {
        Self { store: MemoryStore::new() }
    }

    /// Commit `files` on top of `parents`
    pub fn commit(&self, parents: &[&CommitId], files: &[(&str, &str)], message: &str) -> CommitId {
        let parents: Vec<CommitId> = parents.iter().map(|p| (*p).clone()).collect();
        self.store.create_commit(&parents, self.tree(files), message)
    }

    /// Write blobs and return their tree
    pub fn tree(&self, files: &[(&str, &str)]) -> Tree {
        self.store.write_tree(files.iter().map(|(p, c)| (*p, c.as_bytes())))
    }

    pub fn set_working_tree(&self, files: &[(&str, &str)]) {
        self.store.set_working_tree(self.tree(files));
    }

    /// Synchronize the working tree against `base` and `remote`
    pub fn synchronize(&self, base: &CommitId, remote: &CommitId) -> SyncReport {
        Synchronizer::new(&self.store, SyncConfig::default())
            .unwrap()
            .synchronize(
                &SnapshotId::WorkingTree,
                &SnapshotId::Commit(base.clone()),
                &SnapshotId::Commit(remote.clone()),
                &PathFilter::all(),
            )
            .unwrap()
    }
}

impl Default for ScenarioHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_remote_ahead_is_incoming() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("greeting.txt", "hello")], "C1");
        let c2 = harness.commit(&[&c1], &[("greeting.txt", "world")], "C2");
        harness.set_working_tree(&[("greeting.txt", "hello")]);

        let report = harness.synchronize(&c1, &c2);
        assert_eq!(
            report.status_of(&RepoPath::new("greeting.txt")),
            Some(SyncStatus::incoming(ChangeKind::Change))
        );
        assert_eq!(report.count(Direction::Incoming), 1);
    }

    #[test]
    fn test_base_ahead_is_outgoing() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("greeting.txt", "hello")], "C1");
        let c2 = harness.commit(&[&c1], &[("greeting.txt", "world")], "C2");
        harness.set_working_tree(&[("greeting.txt", "world")]);

        let report = harness.synchronize(&c2, &c1);
        assert_eq!(
            report.status_of(&RepoPath::new("greeting.txt")),
            Some(SyncStatus::outgoing(ChangeKind::Change))
        );
    }

    #[test]
    fn test_divergent_branches_conflict() {
        let harness = ScenarioHarness::new();
        let c0 = harness.commit(&[], &[("greeting.txt", "hi"), ("other.txt", "o")], "C0");
        let c1 = harness.commit(&[&c0], &[("greeting.txt", "hello"), ("other.txt", "o")], "C1");
        let c2 = harness.commit(&[&c0], &[("greeting.txt", "world"), ("other.txt", "o")], "C2");
        harness.set_working_tree(&[("greeting.txt", "hello"), ("other.txt", "o")]);

        let report = harness.synchronize(&c1, &c2);
        assert_eq!(
            report.status_of(&RepoPath::new("greeting.txt")),
            Some(SyncStatus::conflicting(ChangeKind::Change))
        );
        assert_eq!(report.status_of(&RepoPath::new("other.txt")), Some(SyncStatus::in_sync()));
    }

    #[test]
    fn test_local_edit_wins_over_history() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("f", "v1")], "C1");
        let c2 = harness.commit(&[&c1], &[("f", "v2")], "C2");
        harness.set_working_tree(&[("f", "local")]);

        let report = harness.synchronize(&c1, &c2);
        assert_eq!(
            report.status_of(&RepoPath::new("f")),
            Some(SyncStatus::outgoing(ChangeKind::Change))
        );
    }

    #[test]
    fn test_folders_and_removed_paths() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("src/lib.rs", "lib"), ("src/gone.rs", "gone")], "C1");
        let c2 = harness.commit(&[&c1], &[("src/lib.rs", "lib"), ("docs/new.md", "doc")], "C2");
        harness.set_working_tree(&[("src/lib.rs", "lib"), ("src/gone.rs", "gone")]);

        let report = harness.synchronize(&c1, &c2);
        assert_eq!(report.status_of(&RepoPath::new("src")), Some(SyncStatus::in_sync()));
        assert_eq!(report.status_of(&RepoPath::new("src/lib.rs")), Some(SyncStatus::in_sync()));
        // Present locally and in the base, absent remotely
        assert_eq!(
            report.status_of(&RepoPath::new("src/gone.rs")),
            Some(SyncStatus::outgoing(ChangeKind::Addition))
        );
        // Only remote: three-way comparison of absent, absent, present
        assert_eq!(
            report.status_of(&RepoPath::new("docs/new.md")),
            Some(SyncStatus::conflicting(ChangeKind::Change))
        );
        assert!(report.status_of(&RepoPath::root()).is_none());
    }

    #[test]
    fn test_report_serializes() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("f", "v1")], "C1");
        harness.set_working_tree(&[("f", "v1")]);

        let report = harness.synchronize(&c1, &c1);
        assert!(report.is_in_sync());

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        report.write_json(&path).unwrap();
        let loaded: SyncReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_collapsed_folder_chain() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("a/b/c/x", "1"), ("a/b/c/y", "1"), ("top", "t")], "C1");
        let c2 = harness.commit(&[&c1], &[("a/b/c/x", "2"), ("a/b/c/y", "2"), ("top", "t")], "C2");

        let root = DiffTreeBuilder::new(&harness.store)
            .build_two_way(&SnapshotId::Commit(c1), &SnapshotId::Commit(c2))
            .unwrap();

        assert_eq!(root.children().len(), 1);
        let folder = &root.children()[0];
        assert_eq!(folder.name(), "a/b/c");
        let leaves: Vec<_> = folder.children().iter().map(|n| (n.name(), n.kind())).collect();
        assert_eq!(leaves, vec![("x", DiffKind::Change), ("y", DiffKind::Change)]);
    }

    #[test]
    fn test_containers_from_config() {
        let harness = ScenarioHarness::new();
        let left = harness.store.insert_detached("left", harness.tree(&[("vendor/dep/lib.rs", "1"), ("src/a", "1")]));
        let right = harness.store.insert_detached("right", harness.tree(&[("vendor/dep/lib.rs", "2"), ("src/a", "2")]));
        let config = SyncConfigBuilder::new().containers(vec!["vendor".to_string()]).build().unwrap();

        let root = DiffTreeBuilder::new(&harness.store)
            .with_config(&config)
            .build_two_way(&left, &right)
            .unwrap();

        let src = root.find("src").and_then(|n| n.as_folder()).unwrap();
        assert!(!src.is_container());
        let vendor = root.find("vendor/dep").and_then(|n| n.as_folder()).unwrap();
        assert!(vendor.is_container());
    }

    #[test]
    fn test_conflict_aware_merge() {
        let harness = ScenarioHarness::new();
        let base = harness.commit(&[], &[("f", "base"), ("g", "g0"), ("h", "h0")], "base");
        let head = harness.commit(&[&base], &[("f", "ours"), ("g", "g0"), ("h", "h0")], "ours");
        let other = harness.commit(&[&base], &[("f", "theirs"), ("g", "g1"), ("h", "h0")], "theirs");

        let mut index = Tree::new();
        index.insert(RepoPath::new("f"), TreeEntry::staged(harness.store.write_blob(b"ours"), 2));
        index.insert(RepoPath::new("g"), TreeEntry::new(harness.store.write_blob(b"g1")));
        index.insert(RepoPath::new("h"), TreeEntry::new(harness.store.write_blob(b"h0")));
        harness.store.set_index(index);
        harness.set_working_tree(&[("f", "<<<<<<< ours"), ("g", "g1"), ("h", "h0")]);
        harness.store.set_ref("HEAD", head);
        harness.store.set_ref("MERGE_HEAD", other);

        let mut builder = DiffTreeBuilder::new(&harness.store);
        let root = builder.build_merge_in_progress().unwrap();
        assert_eq!(root.leaf_count(), 2);

        let conflict = root.find("f").and_then(|n| n.as_leaf()).unwrap();
        assert_eq!(conflict.kind, DiffKind::Conflict);
        assert_eq!(conflict.merge_state, Some(MergeState::Conflicting));
        let ancestor = conflict.ancestor.as_ref().unwrap();
        assert_eq!(ancestor.snapshot(), &SnapshotId::Commit(base.clone()));
        assert_eq!(harness.store.read_blob(ancestor.content_id()).unwrap(), b"base");
        let right = conflict.right.as_ref().unwrap();
        assert_eq!(harness.store.read_blob(right.content_id()).unwrap(), b"theirs");

        let merged = root.find("g").unwrap();
        assert_eq!(merged.kind(), DiffKind::Change);
        assert_eq!(merged.as_leaf().unwrap().merge_state, Some(MergeState::AutoMerged));
        assert!(root.find("h").is_none());
    }

    #[test]
    fn test_auto_merged_without_ancestor() {
        let harness = ScenarioHarness::new();
        let head = harness.commit(&[], &[("f", "ours")], "unrelated ours");
        let other = harness.commit(&[], &[("f", "theirs")], "unrelated theirs");

        let mut index = Tree::new();
        index.insert(RepoPath::new("f"), TreeEntry::new(harness.store.write_blob(b"theirs")));
        harness.store.set_index(index);
        harness.set_working_tree(&[("f", "theirs")]);

        let root = DiffTreeBuilder::new(&harness.store)
            .build_conflict_aware(&head, &other)
            .unwrap();
        let leaf = root.find("f").unwrap();
        assert_eq!(leaf.kind(), DiffKind::Change);
        assert_eq!(leaf.as_leaf().unwrap().merge_state, Some(MergeState::AutoMerged));
        assert!(leaf.ancestor().is_none());
        assert!(leaf.left().is_some());
    }

    #[test]
    fn test_untracked_file_is_not_auto_merged() {
        let harness = ScenarioHarness::new();
        let head = harness.commit(&[], &[("a", "1")], "ours");
        let other = harness.commit(&[&head], &[("a", "1")], "theirs");

        let mut index = Tree::new();
        index.insert(RepoPath::new("a"), TreeEntry::new(harness.store.write_blob(b"1")));
        harness.store.set_index(index);
        harness.set_working_tree(&[("a", "1"), ("scratch.txt", "notes")]);

        let root = DiffTreeBuilder::new(&harness.store)
            .build_conflict_aware(&head, &other)
            .unwrap();
        assert!(root.find("scratch.txt").is_none());
        assert_eq!(root.leaf_count(), 0);
    }

    #[test]
    fn test_merge_without_merge_head() {
        let harness = ScenarioHarness::new();
        let head = harness.commit(&[], &[("f", "x")], "only");
        harness.store.set_ref("HEAD", head);

        let err = DiffTreeBuilder::new(&harness.store)
            .build_merge_in_progress()
            .unwrap_err();
        assert!(matches!(err, TreeSyncError::SnapshotUnresolvable(_)));
    }

    #[test]
    fn test_scope_spanning_repositories() {
        let err = Scope::from_selection(&["/repos/a/src", "/repos/b/src"], &["/repos/a", "/repos/b"]).unwrap_err();
        assert!(matches!(err, TreeSyncError::AmbiguousScope(_)));
        assert!(err.user_message().contains("more than one repository"));
    }

    #[test]
    fn test_scope_restricts_synchronize() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("app/main.rs", "v1"), ("lib/lib.rs", "v1")], "C1");
        let c2 = harness.commit(&[&c1], &[("app/main.rs", "v2"), ("lib/lib.rs", "v2")], "C2");
        harness.set_working_tree(&[("app/main.rs", "v1"), ("lib/lib.rs", "v1")]);

        let scope = Scope::from_selection(&["/work/repo/app"], &["/work/repo"]).unwrap();
        let report = Synchronizer::new(&harness.store, SyncConfig::default())
            .unwrap()
            .synchronize(
                &SnapshotId::WorkingTree,
                &SnapshotId::Commit(c1),
                &SnapshotId::Commit(c2),
                &scope.filter(),
            )
            .unwrap();

        assert_eq!(
            report.status_of(&RepoPath::new("app/main.rs")),
            Some(SyncStatus::incoming(ChangeKind::Change))
        );
        assert!(report.status_of(&RepoPath::new("lib/lib.rs")).is_none());
    }

    #[test]
    #[traced_test]
    fn test_working_tree_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        create_files(
            temp_dir.path(),
            &[("src/main.rs", "fn main() {}"), ("target/debug/app", "binary"), ("README.md", "readme")],
        );

        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("src/main.rs", "fn main() {}"), ("README.md", "old readme")], "C1");

        let config = SyncConfigBuilder::new().ignore_patterns(vec!["target".to_string()]).build().unwrap();
        let tree = WorkingTreeScanner::from_config(temp_dir.path(), &config)
            .load_into(&harness.store)
            .unwrap();
        assert!(tree.get(&RepoPath::new("target/debug/app")).is_none());
        harness.store.set_working_tree(tree);

        let report = Synchronizer::new(&harness.store, config)
            .unwrap()
            .synchronize(
                &SnapshotId::WorkingTree,
                &SnapshotId::Commit(c1.clone()),
                &SnapshotId::Commit(c1),
                &PathFilter::all(),
            )
            .unwrap();

        assert_eq!(report.status_of(&RepoPath::new("src/main.rs")), Some(SyncStatus::in_sync()));
        assert_eq!(
            report.status_of(&RepoPath::new("README.md")),
            Some(SyncStatus::outgoing(ChangeKind::Change))
        );
    }

    #[test]
    fn test_bounded_ancestry_depth() {
        let harness = ScenarioHarness::new();
        let c1 = harness.commit(&[], &[("f", "1")], "C1");
        let c2 = harness.commit(&[&c1], &[("f", "2")], "C2");
        let c3 = harness.commit(&[&c2], &[("f", "3")], "C3");

        let chain = harness.store.ancestry_of(&RepoPath::new("f"), &c3).unwrap();
        assert_eq!(chain.len(), 3);
        let bounded = harness.store.ancestry_of_bounded(&RepoPath::new("f"), &c3, 1).unwrap();
        assert_eq!(bounded.iter().collect::<Vec<_>>(), vec![&c3]);

        // With one commit per chain the base head c1 is no longer visible
        // from the remote side
        harness.set_working_tree(&[("f", "1")]);
        let config = SyncConfigBuilder::new().max_ancestry_depth(1).build().unwrap();
        let report = Synchronizer::new(&harness.store, config)
            .unwrap()
            .synchronize(
                &SnapshotId::WorkingTree,
                &SnapshotId::Commit(c1),
                &SnapshotId::Commit(c3),
                &PathFilter::all(),
            )
            .unwrap();
        assert_eq!(
            report.status_of(&RepoPath::new("f")),
            Some(SyncStatus::conflicting(ChangeKind::Change))
        );
    }
}
