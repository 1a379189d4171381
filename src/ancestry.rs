//! Per-path ancestry chains of one snapshot
//!
//! An [`AncestryIndex`] answers "which commits, newest first, touched this
//! path up to the snapshot tip" for every blob under a scope. Chains are
//! computed eagerly, in parallel, when the index is built and never change
//! afterwards.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::store::SnapshotStore;
use crate::types::{AncestryChain, CommitId, RepoPath};

/// Ancestry chains keyed by path
#[derive(Debug, Clone, Default)]
pub struct AncestryIndex {
    tip: Option<CommitId>,
    chains: HashMap<RepoPath, AncestryChain>,
}

impl AncestryIndex {
    /// Index for a snapshot without history (working tree, index, detached)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compute the chain of every path in `paths` up to `tip`
    ///
    /// `max_depth` bounds every chain (0 = unbounded). Any history walk
    /// failure fails the whole build.
    #[instrument(skip(store, paths, cancel), fields(paths = paths.len()))]
    pub fn build<S>(
        store: &S,
        tip: &CommitId,
        paths: &[RepoPath],
        max_depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Self>
    where
        S: SnapshotStore + ?Sized,
    {
        let chains = paths
            .par_iter()
            .map(|path| -> Result<(RepoPath, AncestryChain)> {
                cancel.check()?;
                let chain = store.ancestry_of_bounded(path, tip, max_depth)?;
                Ok((path.clone(), chain))
            })
            .collect::<Result<HashMap<RepoPath, AncestryChain>>>()?;

        debug!("Built ancestry index at {} for {} paths", tip.short(), chains.len());
        Ok(Self {
            tip: Some(tip.clone()),
            chains,
        })
    }

    /// Snapshot tip the chains end at
    pub fn tip(&self) -> Option<&CommitId> {
        self.tip.as_ref()
    }

    /// Chain of `path`; paths outside the index have an empty chain
    pub fn chain_of(&self, path: &RepoPath) -> AncestryChain {
        self.chains.get(path).cloned().unwrap_or_default()
    }

    /// Number of indexed paths
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether no path is indexed
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
