//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `repo-intel`.
#[derive(Debug, Parser)]
#[command(
    name = "repo-intel",
    version,
    about = "Point-in-time knowledge snapshots of a workspace of repositories"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover repositories, extract facts and persist a snapshot.
    Scan {
        /// Workspace root to scan.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Snapshot identifier; derived from the revision and time when omitted.
        #[arg(long)]
        snapshot_id: Option<String>,
    },
    /// Generate handover documents from the current view.
    Summarize {
        /// Workspace root holding `.repo-intel`.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Only summarize this repository.
        #[arg(long)]
        repo: Option<String>,
    },
    /// Render the internal service map as Mermaid.
    Graph {
        /// Workspace root holding `.repo-intel`.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Compare two persisted snapshots.
    Diff {
        /// Workspace root holding `.repo-intel`.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Base snapshot identifier.
        #[arg(long)]
        base: String,
        /// Head snapshot identifier.
        #[arg(long)]
        head: String,
    },
}
