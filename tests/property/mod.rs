//! Property-based testing for treesync
//!
//! Uses proptest to verify diff tree and classifier invariants across
//! randomly generated snapshots.

use ::treesync::types::{AncestryChain, CommitId, ContentId, RepoPath, SyncStatus, Variant};
use ::treesync::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Generate repository paths with plenty of shared prefixes
fn path_strategy() -> impl Strategy<Value = String> {
    let dirs = prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 0..=3);
    let file = "f[0-3]\\.txt";
    (dirs, file).prop_map(|(dirs, file)| {
        let mut segments: Vec<String> = dirs.into_iter().map(str::to_string).collect();
        segments.push(file);
        segments.join("/")
    })
}

/// Generate a snapshot as path -> content
fn files_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(path_strategy(), "[a-z]{1,4}", 0..24)
}

/// Generate an edit of a snapshot: kept, changed, removed and added paths
fn pair_strategy() -> impl Strategy<Value = (BTreeMap<String, String>, BTreeMap<String, String>)> {
    (files_strategy(), files_strategy(), prop::collection::vec(0u8..3, 24)).prop_map(|(left, extra, edits)| {
        let mut right = BTreeMap::new();
        for ((path, content), edit) in left.iter().zip(edits.iter().cycle()) {
            match edit {
                0 => {
                    right.insert(path.clone(), content.clone());
                }
                1 => {
                    right.insert(path.clone(), format!("{}-changed", content));
                }
                _ => {}
            }
        }
        for (path, content) in extra {
            right.entry(path).or_insert(content);
        }
        (left, right)
    })
}

fn to_tree(files: &BTreeMap<String, String>) -> Tree {
    Tree::from_contents(files.iter().map(|(p, c)| (p.as_str(), c.as_bytes())))
}

/// Paths whose content differs between the two snapshots
fn differing_paths(left: &BTreeMap<String, String>, right: &BTreeMap<String, String>) -> BTreeSet<String> {
    left.keys()
        .chain(right.keys())
        .filter(|path| left.get(*path) != right.get(*path))
        .cloned()
        .collect()
}

fn leaf_paths(root: &FolderNode) -> BTreeSet<String> {
    root.leaves().into_iter().map(|(path, _)| path).collect()
}

/// No folder below the root is a single-folder link or empty
fn assert_fully_collapsed(folder: &FolderNode) {
    for child in folder.children() {
        if let DiffNode::Folder(inner) = child {
            assert!(!inner.is_empty(), "empty folder {}", inner.name());
            assert!(
                !(inner.children().len() == 1 && inner.children()[0].is_folder()),
                "folder {} was not collapsed",
                inner.name()
            );
            assert_fully_collapsed(inner);
        }
    }
}

fn variant_strategy() -> impl Strategy<Value = Option<Variant>> {
    let path = RepoPath::new("p");
    prop_oneof![
        Just(None),
        Just(Some(Variant::folder(path.clone()))),
        "[ab]".prop_map(move |content| Some(Variant::blob(path.clone(), ContentId::of(content.as_bytes())))),
    ]
}

fn chain_strategy() -> impl Strategy<Value = AncestryChain> {
    prop::collection::vec(prop_oneof![Just("c1"), Just("c2"), Just("c3")], 0..3)
        .prop_map(|ids| AncestryChain::new(ids.into_iter().map(CommitId::new).collect()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_two_way_is_idempotent((left, right) in pair_strategy()) {
        let store = MemoryStore::new();
        let l = store.insert_detached("left", to_tree(&left));
        let r = store.insert_detached("right", to_tree(&right));

        let first = DiffTreeBuilder::new(&store).build_two_way(&l, &r).unwrap();
        let second = DiffTreeBuilder::new(&store).build_two_way(&l, &r).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_leaves_are_exactly_the_differing_paths((left, right) in pair_strategy()) {
        let store = MemoryStore::new();
        let l = store.insert_detached("left", to_tree(&left));
        let r = store.insert_detached("right", to_tree(&right));

        let root = DiffTreeBuilder::new(&store).build_two_way(&l, &r).unwrap();
        prop_assert_eq!(leaf_paths(&root), differing_paths(&left, &right));

        for (path, leaf) in root.leaves() {
            let expected = match (left.get(&path), right.get(&path)) {
                (Some(_), None) => DiffKind::Addition,
                (None, Some(_)) => DiffKind::Deletion,
                _ => DiffKind::Change,
            };
            prop_assert_eq!(leaf.kind, expected);
        }
    }

    #[test]
    fn prop_collapse_is_maximal_and_keeps_leaves((left, right) in pair_strategy()) {
        let store = MemoryStore::new();
        let l = store.insert_detached("left", to_tree(&left));
        let r = store.insert_detached("right", to_tree(&right));

        let expanded = DiffTreeBuilder::new(&store).collapse(false).build_two_way(&l, &r).unwrap();
        let collapsed = DiffTreeBuilder::new(&store).build_two_way(&l, &r).unwrap();

        assert_fully_collapsed(&collapsed);
        prop_assert_eq!(leaf_paths(&expanded), leaf_paths(&collapsed));
        prop_assert_eq!(expanded.leaf_count(), collapsed.leaf_count());

        // Collapsing an already collapsed tree changes nothing
        let mut again = collapsed.clone();
        prop_assert_eq!(Collapser::collapse(&mut again), 0);
        prop_assert_eq!(again, collapsed);
    }

    #[test]
    fn prop_classifier_is_total(
        local in variant_strategy(),
        base in variant_strategy(),
        remote in variant_strategy(),
        base_chain in chain_strategy(),
        remote_chain in chain_strategy(),
    ) {
        let path = RepoPath::new("p");
        let status = SyncClassifier::default().classify(&SyncInput {
            path: &path,
            local: local.as_ref(),
            base: base.as_ref(),
            remote: remote.as_ref(),
            base_chain: &base_chain,
            remote_chain: &remote_chain,
        });
        prop_assert_eq!(status.is_in_sync(), status.change().is_none());
    }

    #[test]
    fn prop_agreeing_sides_are_in_sync(
        variant in variant_strategy(),
        base_chain in chain_strategy(),
        remote_chain in chain_strategy(),
    ) {
        let path = RepoPath::new("p");
        let status = SyncClassifier::default().classify(&SyncInput {
            path: &path,
            local: variant.as_ref(),
            base: variant.as_ref(),
            remote: variant.as_ref(),
            base_chain: &base_chain,
            remote_chain: &remote_chain,
        });
        prop_assert_eq!(status, SyncStatus::in_sync());
    }

    #[test]
    fn prop_ignored_paths_are_in_sync(
        local in variant_strategy(),
        base in variant_strategy(),
        remote in variant_strategy(),
    ) {
        let path = RepoPath::new("p");
        let classifier = SyncClassifier::new(IgnorePolicy::new(&["p".to_string()]).unwrap());
        let empty = AncestryChain::empty();
        let status = classifier.classify(&SyncInput {
            path: &path,
            local: local.as_ref(),
            base: base.as_ref(),
            remote: remote.as_ref(),
            base_chain: &empty,
            remote_chain: &empty,
        });
        prop_assert_eq!(status, SyncStatus::in_sync());
    }
}
