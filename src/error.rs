//! Command-level error taxonomy.
//!
//! Only failures that abort a whole command live here. Extractors never
//! produce errors: unreadable or malformed inputs degrade to empty facts.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors surfaced to the caller of a command.
#[derive(Debug, Error)]
pub enum IntelError {
    /// No current inventory exists; `scan` has not been run for this root.
    #[error("missing inventory at {}; run scan first", path.display())]
    MissingInventory {
        /// Expected location of the inventory file.
        path: PathBuf,
    },

    /// A snapshot identifier was requested that was never persisted.
    #[error("missing snapshot inventory for '{id}': {}", path.display())]
    MissingSnapshot {
        /// The requested snapshot identifier.
        id: String,
        /// Expected location of the snapshot's inventory file.
        path: PathBuf,
    },

    /// A scan targeted a snapshot identifier that already holds a valid snapshot.
    #[error("snapshot '{id}' already exists and snapshots are immutable")]
    SnapshotExists {
        /// The conflicting snapshot identifier.
        id: String,
    },

    /// A snapshot identifier is not usable as a single directory name.
    #[error("invalid snapshot id '{id}': must be a single path segment")]
    InvalidSnapshotId {
        /// The rejected identifier.
        id: String,
    },

    /// `summarize --repo` named a repository absent from the inventory.
    #[error("no repo matched --repo={name}")]
    RepoNotFound {
        /// The requested repository name.
        name: String,
    },

    /// Writing a persisted artifact failed.
    #[error("failed to write {}: {message}", path.display())]
    Write {
        /// Target path of the failed write.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// Reading a required input failed.
    #[error("failed to read {}: {message}", path.display())]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// A fact structure could not be serialized.
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        /// Which artifact was being serialized.
        what: String,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The optional configuration file exists but is malformed.
    #[error("invalid configuration {}: {message}", path.display())]
    Config {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },

    /// The async runtime could not be started or a scan task failed to join.
    #[error("scan runtime failure: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_names_identifier_and_path() {
        let err = IntelError::MissingSnapshot {
            id: "base".to_string(),
            path: PathBuf::from("/w/.repo-intel/snapshots/base/inventory.json"),
        };
        let message = err.to_string();
        assert!(message.contains("'base'"));
        assert!(message.contains("/w/.repo-intel/snapshots/base/inventory.json"));
    }

    #[test]
    fn invalid_snapshot_id_quotes_identifier() {
        let err = IntelError::InvalidSnapshotId { id: "../up".to_string() };
        assert_eq!(err.to_string(), "invalid snapshot id '../up': must be a single path segment");
    }

    #[test]
    fn missing_inventory_suggests_scan() {
        let err = IntelError::MissingInventory { path: PathBuf::from("/w/.repo-intel/inventory.json") };
        assert!(err.to_string().ends_with("run scan first"));
    }
}
