//! Scanning on-disk directories into snapshot trees
//!
//! The [`WorkingTreeScanner`] walks a directory with the `ignore` crate,
//! honouring `.gitignore` files plus custom ignore patterns, and hashes
//! every file into a [`Tree`] keyed by repository-relative path. The `.git`
//! directory is always skipped.
//!
//! ```rust,no_run
//! use treesync::store::MemoryStore;
//! use treesync::worktree::WorkingTreeScanner;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let tree = WorkingTreeScanner::new("./my_project")
//!     .ignore_patterns(vec!["target".to_string()])
//!     .load_into(&store)?;
//! store.set_working_tree(tree);
//! # Ok(())
//! # }
//! ```

use ignore::{overrides::OverrideBuilder, WalkBuilder, WalkState};
use parking_lot::Mutex;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::SyncConfig;
use crate::error::{Result, TreeSyncError};
use crate::store::MemoryStore;
use crate::tree::{Tree, TreeEntry};
use crate::types::{ContentId, RepoPath};

/// Scans a directory into a [`Tree`]
#[derive(Debug, Clone)]
pub struct WorkingTreeScanner {
    root: PathBuf,
    ignore_patterns: Vec<String>,
    follow_symlinks: bool,
    parallel_workers: usize,
}

impl WorkingTreeScanner {
    /// Scanner for `root` with default settings
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            parallel_workers: num_cpus::get(),
        }
    }

    /// Scanner for `root` using the patterns and walk settings of `config`
    pub fn from_config(root: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self::new(root)
            .ignore_patterns(config.ignore_patterns.clone())
            .follow_symlinks(config.follow_symlinks)
            .parallel_workers(config.parallel_workers)
    }

    /// Set additional ignore patterns (gitignore syntax)
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set whether symbolic links are followed
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the number of walker threads (0 = let the walker decide)
    pub fn parallel_workers(mut self, count: usize) -> Self {
        self.parallel_workers = count;
        self
    }

    /// Directory being scanned
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hash every file without keeping its content
    ///
    /// Walks the directory in parallel, honouring `.gitignore` files and the
    /// configured ignore patterns, then streams every file through SHA-256.
    ///
    /// # Returns
    ///
    /// A [`Tree`] keyed by repository-relative path. Only regular files are
    /// included; unfollowed symbolic links are skipped.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The root is not a directory
    /// - An ignore pattern is invalid
    /// - Any entry cannot be walked, such as a dangling symbolic link or a
    ///   link loop while following links
    /// - Any file cannot be read
    ///
    /// A failure anywhere fails the whole scan; no partial tree is returned.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use treesync::WorkingTreeScanner;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let tree = WorkingTreeScanner::new("./my_project")
    ///     .ignore_patterns(vec!["target/".to_string()])
    ///     .follow_symlinks(true)
    ///     .scan()?;
    /// println!("{} files", tree.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn scan(&self) -> Result<Tree> {
        let started = Instant::now();
        let files = self.collect_files()?;

        let entries = files
            .par_iter()
            .map(|(path, absolute)| -> Result<(RepoPath, TreeEntry)> {
                let id = hash_file(absolute)?;
                trace!("Hashed {} -> {}", path, id.short());
                Ok((path.clone(), TreeEntry::new(id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let tree: Tree = entries.into_iter().collect();
        info!("Scanned {} files under {:?} in {:?}", tree.len(), self.root, started.elapsed());
        Ok(tree)
    }

    /// Read every file into `store` and return the matching tree
    pub fn load_into(&self, store: &MemoryStore) -> Result<Tree> {
        let started = Instant::now();
        let files = self.collect_files()?;

        let entries = files
            .par_iter()
            .map(|(path, absolute)| -> Result<(RepoPath, TreeEntry)> {
                let content = fs::read(absolute)?;
                Ok((path.clone(), TreeEntry::new(store.write_blob(&content))))
            })
            .collect::<Result<Vec<_>>>()?;

        let tree: Tree = entries.into_iter().collect();
        info!("Loaded {} files under {:?} in {:?}", tree.len(), self.root, started.elapsed());
        Ok(tree)
    }

    /// Walk the directory, returning `(repository path, absolute path)` per file
    fn collect_files(&self) -> Result<Vec<(RepoPath, PathBuf)>> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root.display()),
            )
            .into());
        }

        let mut walker_builder = WalkBuilder::new(&self.root);
        walker_builder
            .follow_links(self.follow_symlinks)
            .hidden(false)
            .parents(true)
            .ignore(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .threads(self.parallel_workers);

        // A leading `!` in an override ignores the match
        let mut override_builder = OverrideBuilder::new(&self.root);
        override_builder.add("!.git/")?;
        for pattern in &self.ignore_patterns {
            let final_pattern = match pattern.strip_prefix('!') {
                Some(included) => included.to_string(),
                None => format!("!{}", pattern),
            };
            override_builder.add(&final_pattern)?;
        }
        walker_builder.overrides(override_builder.build()?);

        let collected = Arc::new(Mutex::new(Vec::new()));
        let failure: Arc<Mutex<Option<TreeSyncError>>> = Arc::new(Mutex::new(None));
        let root = self.root.clone();

        walker_builder.build_parallel().run(|| {
            let collected = Arc::clone(&collected);
            let failure = Arc::clone(&failure);
            let root = root.clone();

            Box::new(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Walk error: {}", e);
                        failure.lock().get_or_insert(TreeSyncError::Walk(e));
                        return WalkState::Quit;
                    }
                };
                let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                if !is_file {
                    return WalkState::Continue;
                }
                let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                match RepoPath::from_path(relative) {
                    Ok(path) => {
                        collected.lock().push((path, entry.path().to_path_buf()));
                        WalkState::Continue
                    }
                    Err(e) => {
                        warn!("Cannot map {:?}: {}", entry.path(), e);
                        failure.lock().get_or_insert(e);
                        WalkState::Quit
                    }
                }
            })
        });

        // No partial tree once any entry failed
        if let Some(e) = failure.lock().take() {
            return Err(e);
        }

        let mut files = std::mem::take(&mut *collected.lock());
        files.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("Collected {} files under {:?}", files.len(), self.root);
        Ok(files)
    }
}

/// Stream a file through SHA-256
fn hash_file(path: &Path) -> Result<ContentId> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentId::from_hex(hex::encode(hasher.finalize())))
}
