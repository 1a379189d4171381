//! Commit-graph walks shared by snapshot stores
//!
//! Two walks are needed by the comparison engine:
//!
//! - [`path_history`]: the ancestry chain of one path, newest first. Commits
//!   are visited in descending commit time across the union of all parents;
//!   a commit belongs to the chain when it changed the path relative to its
//!   parents. A merge commit only counts when the path differs from every
//!   parent, so content merely carried over from one side of a merge is
//!   attributed to the commit that introduced it there. Only the exact path
//!   is followed; renames are never chased.
//! - [`merge_base`]: the first commit reachable from both tips, found by a
//!   bidirectional walk in descending commit time.
//!
//! Both walks only need [`SnapshotStore::commit_info`] and
//! [`SnapshotStore::open_tree`], so any store gets them for free through the
//! trait's default methods.
//!
//! ```text
//!   C1 ── C2 ── C4   (tip)
//!     \        /
//!      ── C3 ──
//!
//! merge_base(C2, C3) == C1
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::error::Result;
use crate::store::SnapshotStore;
use crate::tree::TreeEntry;
use crate::types::{AncestryChain, CommitId, RepoPath, SnapshotId};

/// Queue item ordered by commit time, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    time: DateTime<Utc>,
    id: CommitId,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entries at or below `path` in a commit's tree
fn path_state<S>(store: &S, commit: &CommitId, path: &RepoPath) -> Result<Vec<(RepoPath, TreeEntry)>>
where
    S: SnapshotStore + ?Sized,
{
    let tree = store.open_tree(&SnapshotId::Commit(commit.clone()))?;
    Ok(tree
        .entries_under(path)
        .map(|(p, e)| (p.clone(), e.clone()))
        .collect())
}

/// Commits that modified `path`, most recent first
///
/// `limit` bounds the number of commits returned (0 = unbounded); the walk
/// stops once the bound is reached.
pub fn path_history<S>(store: &S, path: &RepoPath, tip: &CommitId, limit: usize) -> Result<AncestryChain>
where
    S: SnapshotStore + ?Sized,
{
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = BinaryHeap::new();
    let mut states: HashMap<CommitId, Vec<(RepoPath, TreeEntry)>> = HashMap::new();

    let tip_info = store.commit_info(tip)?;
    seen.insert(tip.clone());
    queue.push(Pending { time: tip_info.time, id: tip.clone() });

    while let Some(Pending { id, .. }) = queue.pop() {
        let info = store.commit_info(&id)?;
        let state = match states.remove(&id) {
            Some(state) => state,
            None => path_state(store, &id, path)?,
        };

        let mut parent_states = Vec::with_capacity(info.parents.len());
        for parent in &info.parents {
            let parent_state = match states.get(parent) {
                Some(cached) => cached.clone(),
                None => {
                    let computed = path_state(store, parent, path)?;
                    states.insert(parent.clone(), computed.clone());
                    computed
                }
            };
            parent_states.push(parent_state);
        }

        let touched = if parent_states.is_empty() {
            !state.is_empty()
        } else {
            parent_states.iter().all(|parent_state| *parent_state != state)
        };

        if touched {
            trace!("{} touched {}", id.short(), path);
            chain.push(id.clone());
            if limit > 0 && chain.len() >= limit {
                break;
            }
        }

        for parent in &info.parents {
            if seen.insert(parent.clone()) {
                let parent_info = store.commit_info(parent)?;
                queue.push(Pending { time: parent_info.time, id: parent.clone() });
            }
        }
    }

    debug!("History of {} from {}: {} commits", path, tip.short(), chain.len());
    Ok(AncestryChain::new(chain))
}

const FROM_A: u8 = 0b01;
const FROM_B: u8 = 0b10;
const FROM_BOTH: u8 = FROM_A | FROM_B;

/// First commit reachable from both `a` and `b`
///
/// Returns `None` when the histories share no commit.
pub fn merge_base<S>(store: &S, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>>
where
    S: SnapshotStore + ?Sized,
{
    if a == b {
        return Ok(Some(a.clone()));
    }

    let mut states: HashMap<CommitId, u8> = HashMap::new();
    let mut queue = BinaryHeap::new();

    for (tip, flag) in [(a, FROM_A), (b, FROM_B)] {
        let info = store.commit_info(tip)?;
        states.insert(tip.clone(), flag);
        queue.push(Pending { time: info.time, id: tip.clone() });
    }

    while let Some(Pending { id, .. }) = queue.pop() {
        let state = states.get(&id).copied().unwrap_or(0);
        if state == FROM_BOTH {
            debug!("Merge base of {} and {} is {}", a.short(), b.short(), id.short());
            return Ok(Some(id));
        }

        let info = store.commit_info(&id)?;
        for parent in &info.parents {
            let parent_state = states.get(parent).copied().unwrap_or(0);
            let merged = parent_state | state;
            if merged != parent_state {
                states.insert(parent.clone(), merged);
                let parent_info = store.commit_info(parent)?;
                queue.push(Pending { time: parent_info.time, id: parent.clone() });
            }
        }
    }

    debug!("No merge base between {} and {}", a.short(), b.short());
    Ok(None)
}
