//! Concurrency tests for treesync
//!
//! Shared synchronizers and caches used from many threads, and cooperative
//! cancellation from outside a running build.

use ::treesync::types::{CommitId, RepoPath, SnapshotId};
use ::treesync::*;
use std::sync::Arc;
use std::thread;

/// A store with `commits` linear commits over `files` paths
pub fn linear_history(commits: usize, files: usize) -> (MemoryStore, Vec<CommitId>) {
    let store = MemoryStore::new();
    let mut ids: Vec<CommitId> = Vec::with_capacity(commits);
    for round in 0..commits {
        let mut tree = Tree::new();
        for i in 0..files {
            // Each round rewrites every fifth file
            let version = if i % 5 == round % 5 { round } else { 0 };
            let content = format!("file {} version {}", i, version);
            tree.insert(
                RepoPath::new(&format!("dir{}/file{}.txt", i % 7, i)),
                TreeEntry::new(store.write_blob(content.as_bytes())),
            );
        }
        let parents: Vec<CommitId> = ids.last().cloned().into_iter().collect();
        ids.push(store.create_commit(&parents, tree, &format!("round {}", round)));
    }
    (store, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_shared_synchronizer_across_threads() {
        let (store, ids) = linear_history(6, 40);
        store.set_working_tree(store.open_tree(&SnapshotId::Commit(ids[2].clone())).unwrap().as_ref().clone());
        let synchronizer = Synchronizer::new(&store, SyncConfig::default()).unwrap();
        let base = SnapshotId::Commit(ids[2].clone());
        let remote = SnapshotId::Commit(ids[5].clone());

        let reports: Vec<SyncReport> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        synchronizer
                            .synchronize(&SnapshotId::WorkingTree, &base, &remote, &PathFilter::all())
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for report in &reports[1..] {
            assert_eq!(report.entries, reports[0].entries);
        }
        assert!(!reports[0].is_in_sync());
        assert_eq!(synchronizer.cache().len(), 3);
        let (hits, misses) = synchronizer.cache().stats();
        assert_eq!(hits + misses, 8 * 3);
    }

    #[test]
    fn test_shared_variant_cache() {
        let (store, ids) = linear_history(4, 30);
        let cache = Arc::new(VariantCache::new());
        let cancel = CancellationToken::new();
        let snapshot = SnapshotId::Commit(ids[3].clone());

        let trees: Vec<Arc<VariantTree>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let (store, snapshot, cancel) = (&store, &snapshot, &cancel);
                    scope.spawn(move || cache.get_or_build(store, snapshot, &PathFilter::all(), 0, cancel).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        for tree in &trees[1..] {
            assert_eq!(tree.len(), trees[0].len());
        }
        let chain = trees[0].chain_of(&RepoPath::new("dir3/file3.txt"));
        assert_eq!(chain.head(), Some(&ids[3]));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let (store, ids) = linear_history(3, 50);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        thread::spawn(move || canceller.cancel()).join().unwrap();

        let err = DiffTreeBuilder::new(&store)
            .cancellation(cancel.clone())
            .build_two_way(&SnapshotId::Commit(ids[0].clone()), &SnapshotId::Commit(ids[2].clone()))
            .unwrap_err();
        assert!(err.is_cancelled());

        let cache = VariantCache::new();
        let err = cache
            .get_or_build(&store, &SnapshotId::Commit(ids[2].clone()), &PathFilter::all(), 0, &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_is_shareable() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.resolve(if i % 2 == 0 { "WORKTREE" } else { "INDEX" }).unwrap())
            })
            .collect();
        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(resolved[0], SnapshotId::WorkingTree);
        assert_eq!(resolved[1], SnapshotId::Index);
    }
}
