//! Configuration for comparison and synchronize runs
//!
//! [`SyncConfig`] is plain serde data so it can live in a JSON file next to a
//! repository; [`SyncConfigBuilder`] is the programmatic way to assemble one.
//! Ignore patterns are compiled once into an [`IgnorePolicy`].
//!
//! ## Example
//!
//! ```rust
//! use treesync::config::SyncConfigBuilder;
//! use treesync::types::RepoPath;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfigBuilder::new()
//!     .ignore_patterns(vec!["*.log".to_string(), "target".to_string()])
//!     .containers(vec!["projects".to_string()])
//!     .max_ancestry_depth(100)
//!     .build()?;
//!
//! let policy = config.ignore_policy()?;
//! assert!(policy.is_ignored(&RepoPath::new("target/debug/app")));
//! assert!(!policy.is_ignored(&RepoPath::new("src/main.rs")));
//! # Ok(())
//! # }
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TreeSyncError};
use crate::types::RepoPath;

/// Settings shared by diff and synchronize runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Glob patterns of paths treated as always in sync (gitignore style)
    pub ignore_patterns: Vec<String>,
    /// Top-level folder names tagged as containers in diff trees
    pub containers: Vec<String>,
    /// Maximum commits per ancestry chain (0 = unbounded)
    pub max_ancestry_depth: usize,
    /// Worker threads for parallel classification (0 = rayon default)
    pub parallel_workers: usize,
    /// Whether the working tree scanner follows symbolic links
    pub follow_symlinks: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            containers: Vec::new(),
            max_ancestry_depth: 0,
            parallel_workers: num_cpus::get(),
            follow_symlinks: false,
        }
    }
}

impl SyncConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SyncConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for unusable values
    pub fn validate(&self) -> Result<()> {
        if let Some(pattern) = self.ignore_patterns.iter().find(|p| p.trim().is_empty()) {
            return Err(TreeSyncError::InvalidConfiguration(format!(
                "empty ignore pattern {:?}",
                pattern
            )));
        }
        for container in &self.containers {
            if container.is_empty() || container.contains('/') {
                return Err(TreeSyncError::InvalidConfiguration(format!(
                    "container {:?} must be a single path segment",
                    container
                )));
            }
        }
        // Invalid globs fail here
        self.ignore_policy()?;
        Ok(())
    }

    /// Compile the ignore patterns
    pub fn ignore_policy(&self) -> Result<IgnorePolicy> {
        IgnorePolicy::new(&self.ignore_patterns)
    }

    /// Whether `segment` names a configured container
    pub fn is_container(&self, segment: &str) -> bool {
        self.containers.iter().any(|c| c == segment)
    }
}

/// Builder for [`SyncConfig`]
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ignore patterns
    ///
    /// A pattern matches a path when it matches the path itself or any of
    /// its parent folders, so `target` ignores everything below `target/`.
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.ignore_patterns = patterns;
        self
    }

    /// Set container folder names
    pub fn containers(mut self, containers: Vec<String>) -> Self {
        self.config.containers = containers;
        self
    }

    /// Bound ancestry chains (0 = unbounded)
    pub fn max_ancestry_depth(mut self, depth: usize) -> Self {
        self.config.max_ancestry_depth = depth;
        self
    }

    /// Set number of parallel workers (0 = rayon default)
    pub fn parallel_workers(mut self, count: usize) -> Self {
        self.config.parallel_workers = count;
        self
    }

    /// Set whether to follow symbolic links when scanning
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Compiled ignore patterns
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    globs: GlobSet,
    patterns: usize,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl IgnorePolicy {
    /// A policy that ignores nothing
    pub fn none() -> Self {
        Self {
            globs: GlobSet::empty(),
            patterns: 0,
        }
    }

    /// Compile gitignore-style patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let trimmed = pattern.trim().trim_start_matches('/').trim_end_matches('/');
            builder.add(Glob::new(trimmed)?);
        }
        Ok(Self {
            globs: builder.build()?,
            patterns: patterns.len(),
        })
    }

    /// Whether the policy ignores nothing
    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    /// Whether `path` or one of its parent folders matches a pattern
    pub fn is_ignored(&self, path: &RepoPath) -> bool {
        if self.is_empty() || path.is_root() {
            return false;
        }
        let mut current = path.clone();
        loop {
            if self.globs.is_match(current.as_str()) {
                return true;
            }
            current = current.parent();
            if current.is_root() {
                return false;
            }
        }
    }
}
