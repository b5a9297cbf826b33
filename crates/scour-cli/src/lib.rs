//! scour - a safety-gated disk cleanup tool
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Finds and removes stale build outputs and tool caches on macOS without
//! touching anything the protection policy refuses.
//!
//! # Overview
//!
//! `scour scan` walks the configured roots and prints the candidate list;
//! `scour clean` deletes the confirmed subset. Nothing is removed without
//! an explicit confirmation (`--yes` or explicit `--path` selections), and
//! a global `--dry-run` runs the whole pipeline without the removal calls.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.scour/
//! ├── cache.json   # metadata cache shared across runs
//! ├── cache.lock/  # writer lease
//! ├── tmp/         # refresh worker scratch
//! ├── logs/        # operation log (JSONL)
//! └── config.toml  # roots, extra targets, protected paths
//! ```

pub mod cmd;
pub mod ui;

pub use scour_core::paths::*;
pub use scour_core::{
    CandidateArtifact, CleanError, CleanStats, Config, Decision, MetadataCache, PolicyGate,
    ScanOrchestrator, SortKey,
};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scour")]
#[command(author, version, about = "scour - safety-gated disk cleanup for macOS")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan roots and list deletion candidates
    Scan {
        /// Root directories to scan (config/auto-discovery when empty)
        roots: Vec<PathBuf>,
        /// Minimum age in days before an item defaults to selected
        #[arg(long)]
        min_age_days: Option<u64>,
        /// Sort order for the candidate list
        #[arg(long, value_enum, default_value_t = SortArg::Size)]
        sort: SortArg,
        /// Emit the candidate list as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete the confirmed subset of candidates
    Clean {
        /// Root directories to scan (config/auto-discovery when empty)
        roots: Vec<PathBuf>,
        /// Proceed with every default-selected candidate
        #[arg(long, short = 'y')]
        yes: bool,
        /// Proceed with exactly these candidate paths (repeatable)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
        /// Minimum age in days before an item defaults to selected
        #[arg(long)]
        min_age_days: Option<u64>,
    },
    /// Manage the user override whitelist (paths that are never deleted)
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum WhitelistCommands {
    /// Protect an exact path from deletion
    Add {
        /// Absolute path to protect
        path: PathBuf,
    },
    /// Show all protected paths
    List,
}

/// CLI-facing sort order, mapped onto [`SortKey`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    /// Largest first
    Size,
    /// Oldest first
    Age,
    /// Lexicographic by path
    Path,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Size => SortKey::Size,
            SortArg::Age => SortKey::Age,
            SortArg::Path => SortKey::Path,
        }
    }
}
