//! # treesync CLI - Compare directory snapshots
//!
//! Scans two directories into content-addressed snapshots and shows how they
//! differ, either as a flat list of changed paths or as the collapsed diff
//! tree.
//!
//! ## Usage
//! ```bash
//! # List changed paths
//! treesync diff ./old ./new
//!
//! # Show the collapsed diff tree
//! treesync tree ./old ./new
//!
//! # Emit the tree as JSON, ignoring build output
//! treesync tree ./old ./new --json --ignore target/
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use treesync::{
    DiffKind, DiffNode, DiffTreeBuilder, FolderNode, MemoryStore, SyncConfig, SyncConfigBuilder,
    TreeSyncError, WorkingTreeScanner,
};

/// treesync CLI - hierarchical comparison of directory snapshots
#[derive(Parser)]
#[command(name = "treesync")]
#[command(version)]
#[command(about = "Compare two directories as content-addressed snapshots")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Additional ignore patterns (gitignore syntax)
    #[arg(short, long, global = true)]
    ignore: Vec<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the paths that differ between two directories
    Diff {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,

        /// Show only counts per change kind
        #[arg(long)]
        stat: bool,
    },

    /// Show the collapsed diff tree of two directories
    Tree {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,

        /// Keep one folder per path segment
        #[arg(long)]
        no_collapse: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose raises the default to debug
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() || cli.json {
        colored::control::set_override(false);
    }

    let config = load_config(cli.config.as_deref(), cli.ignore)?;

    let result = match cli.command {
        Commands::Diff { left, right, stat } => cmd_diff(&config, &left, &right, stat, cli.json),
        Commands::Tree { left, right, no_collapse } => cmd_tree(&config, &left, &right, !no_collapse, cli.json),
    };

    result.map_err(|e| match e.downcast::<TreeSyncError>() {
        Ok(err) => anyhow::anyhow!(err.user_message()),
        Err(other) => other,
    })
}

/// Merge the configuration file with command line ignore patterns
fn load_config(path: Option<&Path>, ignore: Vec<String>) -> anyhow::Result<SyncConfig> {
    let base = match path {
        Some(path) => SyncConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SyncConfig::default(),
    };

    let mut patterns = base.ignore_patterns.clone();
    patterns.extend(ignore);

    let config = SyncConfigBuilder::new()
        .ignore_patterns(patterns)
        .containers(base.containers.clone())
        .max_ancestry_depth(base.max_ancestry_depth)
        .parallel_workers(base.parallel_workers)
        .follow_symlinks(base.follow_symlinks)
        .build()?;
    Ok(config)
}

/// Scan both directories and build their diff tree
fn build_tree(config: &SyncConfig, left: &Path, right: &Path, collapse: bool) -> anyhow::Result<FolderNode> {
    let store = MemoryStore::new();

    let left_tree = WorkingTreeScanner::from_config(left, config)
        .load_into(&store)
        .with_context(|| format!("failed to scan {}", left.display()))?;
    let right_tree = WorkingTreeScanner::from_config(right, config)
        .load_into(&store)
        .with_context(|| format!("failed to scan {}", right.display()))?;

    let left_id = store.insert_detached(&left.display().to_string(), left_tree);
    let right_id = store.insert_detached(&right.display().to_string(), right_tree);

    let root = DiffTreeBuilder::new(&store)
        .with_config(config)
        .collapse(collapse)
        .build_two_way(&left_id, &right_id)?;
    Ok(root)
}

/// List changed paths
fn cmd_diff(config: &SyncConfig, left: &Path, right: &Path, stat: bool, json: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let root = build_tree(config, left, right, true)?;
    let leaves = root.leaves();

    if json {
        let entries: Vec<_> = leaves
            .iter()
            .map(|(path, leaf)| serde_json::json!({ "path": path, "kind": leaf.kind }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let count = |kind: DiffKind| leaves.iter().filter(|(_, leaf)| leaf.kind == kind).count();

    if !stat {
        for (path, leaf) in &leaves {
            println!("{} {}", kind_marker(leaf.kind), path);
        }
        if !leaves.is_empty() {
            println!();
        }
    }

    if leaves.is_empty() {
        println!("{} Directories are identical", "✓".green().bold());
    } else {
        println!(
            "{} added, {} deleted, {} changed",
            count(DiffKind::Addition).to_string().green(),
            count(DiffKind::Deletion).to_string().red(),
            count(DiffKind::Change).to_string().yellow()
        );
    }
    println!("  Time: {}", format!("{:?}", start.elapsed()).cyan());
    Ok(())
}

/// Print the diff tree
fn cmd_tree(config: &SyncConfig, left: &Path, right: &Path, collapse: bool, json: bool) -> anyhow::Result<()> {
    let root = build_tree(config, left, right, collapse)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
        return Ok(());
    }

    if root.is_empty() {
        println!("{} Directories are identical", "✓".green().bold());
        return Ok(());
    }

    println!("{}", ".".bold());
    print_children(root.children(), "");
    Ok(())
}

fn print_children(children: &[DiffNode], prefix: &str) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, extension) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };

        match child {
            DiffNode::Folder(folder) => {
                let name = format!("{}/", folder.name());
                let name = if folder.is_container() { name.magenta().bold() } else { name.blue().bold() };
                println!("{}{}{}", prefix, branch, name);
                print_children(folder.children(), &format!("{}{}", prefix, extension));
            }
            DiffNode::Leaf(leaf) => {
                println!("{}{}{} {}", prefix, branch, kind_marker(leaf.kind), leaf.name);
            }
        }
    }
}

fn kind_marker(kind: DiffKind) -> ColoredString {
    match kind {
        DiffKind::Addition => "A".green().bold(),
        DiffKind::Deletion => "D".red().bold(),
        DiffKind::Change => "M".yellow().bold(),
        DiffKind::Conflict => "U".magenta().bold(),
        DiffKind::NoChange => " ".normal(),
    }
}
