//! Mapping a selection of file system paths to one comparison scope

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TreeSyncError};
use crate::types::RepoPath;
use crate::walk::PathFilter;

/// One repository and the scope roots selected inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    repository: PathBuf,
    roots: Vec<RepoPath>,
}

impl Scope {
    /// A scope covering a whole repository
    pub fn whole(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            roots: vec![RepoPath::root()],
        }
    }

    /// Resolve selected paths against the known repository roots
    ///
    /// Each selected path belongs to the innermost repository containing
    /// it. Fails with `AmbiguousScope` when the selection spans more than one
    /// repository and with `InvalidPath` when a path lies outside all of
    /// them.
    pub fn from_selection<P, R>(selection: &[P], repositories: &[R]) -> Result<Self>
    where
        P: AsRef<Path>,
        R: AsRef<Path>,
    {
        let mut repository: Option<&Path> = None;
        let mut roots = Vec::with_capacity(selection.len());

        for selected in selection {
            let selected: &Path = selected.as_ref();
            let owner = repositories
                .iter()
                .map(<R as AsRef<Path>>::as_ref)
                .filter(|repo| selected.starts_with(repo))
                .max_by_key(|repo| repo.components().count())
                .ok_or_else(|| TreeSyncError::InvalidPath(selected.to_path_buf()))?;

            match repository {
                Some(existing) if existing != owner => {
                    return Err(TreeSyncError::AmbiguousScope(format!(
                        "{}, {}",
                        existing.display(),
                        owner.display()
                    )));
                }
                _ => repository = Some(owner),
            }

            let relative = selected
                .strip_prefix(owner)
                .map_err(|_| TreeSyncError::InvalidPath(selected.to_path_buf()))?;
            roots.push(RepoPath::from_path(relative)?);
        }

        let repository = repository
            .ok_or_else(|| TreeSyncError::AmbiguousScope("empty selection".to_string()))?
            .to_path_buf();
        debug!("Scope {:?} with {} roots", repository, roots.len());
        Ok(Self { repository, roots })
    }

    /// Repository the scope lives in
    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Selected roots, relative to the repository
    pub fn roots(&self) -> &[RepoPath] {
        &self.roots
    }

    /// Walk filter for the scope
    pub fn filter(&self) -> PathFilter {
        PathFilter::new(self.roots.iter().cloned())
    }
}
