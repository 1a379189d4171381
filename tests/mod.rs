//! Main test module for treesync
//!
//! This module includes all test suites:
//! - Integration tests for synchronization and diff scenarios
//! - Concurrency tests for shared caches and cancellation
//! - Property-based tests for invariants
//! - Edge cases over empty and degenerate snapshots

pub mod concurrency;
pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::treesync::types::{ChangeKind, RepoPath, SnapshotId, SyncStatus};
    use ::treesync::*;
    use std::fs;
    use tempfile::TempDir;

    fn files(pairs: &[(&str, &str)]) -> Tree {
        Tree::from_contents(pairs.iter().map(|(p, c)| (*p, c.as_bytes())))
    }

    #[test]
    fn test_empty_snapshots() {
        let store = MemoryStore::new();
        let left = store.insert_detached("left", Tree::new());
        let right = store.insert_detached("right", Tree::new());

        let root = DiffTreeBuilder::new(&store).build_two_way(&left, &right).unwrap();
        assert!(root.is_empty());
        assert_eq!(root.name(), "");
    }

    #[test]
    fn test_same_snapshot_has_no_nodes() {
        let store = MemoryStore::new();
        let snapshot = store.insert_detached("only", files(&[("a/b.txt", "b"), ("c.txt", "c")]));

        let root = DiffTreeBuilder::new(&store).build_two_way(&snapshot, &snapshot).unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn test_against_empty_snapshot() {
        let store = MemoryStore::new();
        let full = store.insert_detached("full", files(&[("x/1", "1"), ("x/2", "2"), ("y", "y")]));
        let empty = store.insert_detached("empty", Tree::new());

        let root = DiffTreeBuilder::new(&store).build_two_way(&full, &empty).unwrap();
        assert_eq!(root.leaf_count(), 3);
        assert!(root.leaves().iter().all(|(_, leaf)| leaf.kind == DiffKind::Addition));

        let root = DiffTreeBuilder::new(&store).build_two_way(&empty, &full).unwrap();
        assert!(root.leaves().iter().all(|(_, leaf)| leaf.kind == DiffKind::Deletion));
    }

    #[test]
    fn test_file_replaced_by_folder() {
        let store = MemoryStore::new();
        let left = store.insert_detached("left", files(&[("a", "file")]));
        let right = store.insert_detached("right", files(&[("a/x", "nested")]));

        let root = DiffTreeBuilder::new(&store).build_two_way(&left, &right).unwrap();
        let names: Vec<_> = root.children().iter().map(|n| (n.name(), n.is_folder())).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&("a", false)));
        assert!(names.contains(&("a", true)));
        assert_eq!(root.leaf_count(), 2);
    }

    #[test]
    fn test_filter_outside_every_path() {
        let store = MemoryStore::new();
        let left = store.insert_detached("left", files(&[("src/a", "1")]));
        let right = store.insert_detached("right", files(&[("src/a", "2")]));

        let root = DiffTreeBuilder::new(&store)
            .filter(PathFilter::new([RepoPath::new("docs")]))
            .build_two_way(&left, &right)
            .unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn test_unknown_snapshot() {
        let store = MemoryStore::new();
        let known = store.insert_detached("known", Tree::new());
        let err = DiffTreeBuilder::new(&store)
            .build_two_way(&known, &SnapshotId::Detached("missing".to_string()))
            .unwrap_err();
        assert!(matches!(err, TreeSyncError::SnapshotUnresolvable(_)));
    }

    #[test]
    fn test_snapshots_without_history() {
        let store = MemoryStore::new();
        let local = store.insert_detached("local", files(&[("f", "same"), ("g", "old")]));
        let base = store.insert_detached("base", files(&[("f", "same"), ("g", "old")]));
        let remote = store.insert_detached("remote", files(&[("f", "same"), ("g", "new")]));

        let synchronizer = Synchronizer::new(&store, SyncConfig::default()).unwrap();
        let report = synchronizer.synchronize(&local, &base, &remote, &PathFilter::all()).unwrap();

        assert_eq!(report.status_of(&RepoPath::new("f")), Some(SyncStatus::in_sync()));
        // No chains on either side, so nothing proves which side is newer
        assert_eq!(
            report.status_of(&RepoPath::new("g")),
            Some(SyncStatus::conflicting(ChangeKind::Change))
        );
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("empty/nested")).unwrap();

        let tree = WorkingTreeScanner::new(temp_dir.path()).scan().unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_unicode_and_spaces_in_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("dossier été")).unwrap();
        fs::write(temp_dir.path().join("dossier été/fichier 1.txt"), "contenu").unwrap();

        let store = MemoryStore::new();
        let tree = WorkingTreeScanner::new(temp_dir.path()).load_into(&store).unwrap();
        let snapshot = store.insert_detached("scan", tree);
        let empty = store.insert_detached("empty", Tree::new());

        let root = DiffTreeBuilder::new(&store).build_two_way(&snapshot, &empty).unwrap();
        assert_eq!(root.children()[0].name(), "dossier été");
        assert!(root.find("dossier été/fichier 1.txt").is_some());
    }
}
