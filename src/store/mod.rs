//! Snapshot store: persistence layer for inventories and per-repository facts.
//!
//! All I/O goes through `ctx.fs`. Directory layout under the scan root:
//!
//! ```text
//! .repo-intel/
//!   ├── inventory.json, inventory.md      current view
//!   ├── repos/<name>/raw/*.json           current facts
//!   ├── repos/<name>/docs/*.md            generated documents
//!   ├── snapshots/<id>/inventory.json     immutable copy (validity marker)
//!   ├── snapshots/<id>/repos/<name>/raw/  immutable facts
//!   ├── diff.json, diff.md
//!   └── org-service-map.mmd
//! ```
//!
//! A snapshot directory counts as valid only once its `inventory.json`
//! exists; that file is always written last.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::model::{Inventory, RepoRawData};
use crate::survey::STATE_DIR;

const INVENTORY_FILE: &str = "inventory.json";

/// One persisted fact domain, one file per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactDomain {
    /// Manifest summary.
    PackageSummary,
    /// Route list.
    Routes,
    /// Full API surface.
    ApiSurface,
    /// Ranked domain terms.
    DomainTerms,
    /// Entities and relationships.
    DbModels,
    /// URL literals.
    OutboundCalls,
    /// Third-party dependencies.
    DependenciesExternal,
    /// Internal dependencies and interactions.
    DependenciesInternal,
    /// Environment variables.
    EnvVars,
    /// Quality signals.
    QualitySignals,
}

impl FactDomain {
    /// Every domain, in persistence order.
    pub const ALL: [Self; 10] = [
        Self::PackageSummary,
        Self::Routes,
        Self::ApiSurface,
        Self::DomainTerms,
        Self::DbModels,
        Self::OutboundCalls,
        Self::DependenciesExternal,
        Self::DependenciesInternal,
        Self::EnvVars,
        Self::QualitySignals,
    ];

    /// File name under `raw/`.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PackageSummary => "package.summary.json",
            Self::Routes => "routes.json",
            Self::ApiSurface => "api_surface.json",
            Self::DomainTerms => "domain_terms.json",
            Self::DbModels => "db_models.json",
            Self::OutboundCalls => "outbound_calls.json",
            Self::DependenciesExternal => "dependencies_external.json",
            Self::DependenciesInternal => "dependencies_internal.json",
            Self::EnvVars => "envvars.json",
            Self::QualitySignals => "quality_signals.json",
        }
    }
}

/// Which copy of the facts to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
    /// The view overwritten by every scan.
    Current,
    /// An immutable snapshot.
    Snapshot(&'a str),
}

/// Serializes a value as pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`IntelError::Serialize`] if serialization fails.
pub fn to_pretty_json<T: Serialize>(what: &str, value: &T) -> Result<String, IntelError> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|source| IntelError::Serialize { what: what.to_string(), source })
}

/// Maps a repository name onto a relative directory that stays below its parent.
///
/// `/` separates segments so `@scope/name` keeps two levels. Empty segments
/// are dropped, `.` and `..` become `_`, and `\`, `:` and NUL become `_`.
#[must_use]
pub fn repo_dir(name: &str) -> PathBuf {
    let mut dir = PathBuf::new();
    for segment in name.split('/').filter(|s| !s.is_empty()) {
        match segment {
            "." | ".." => dir.push("_"),
            _ => dir.push(segment.replace(['\\', ':', '\0'], "_")),
        }
    }
    if dir.as_os_str().is_empty() {
        dir.push("_");
    }
    dir
}

/// Checks that a snapshot identifier names exactly one directory.
///
/// # Errors
///
/// Returns [`IntelError::InvalidSnapshotId`] for an empty identifier, `.`,
/// `..`, or one containing `/`, `\`, `:` or NUL.
pub fn validate_snapshot_id(id: &str) -> Result<(), IntelError> {
    let invalid =
        id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', ':', '\0']);
    if invalid {
        return Err(IntelError::InvalidSnapshotId { id: id.to_string() });
    }
    Ok(())
}

/// Persistence layer rooted at `<scan root>/.repo-intel`.
pub struct SnapshotStore<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> SnapshotStore<'a> {
    /// Creates a store for the workspace at `scan_root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, scan_root: &Path) -> Self {
        Self { ctx, root: scan_root.join(STATE_DIR) }
    }

    /// The state directory.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.root
    }

    fn view_root(&self, view: View<'_>) -> PathBuf {
        match view {
            View::Current => self.root.clone(),
            View::Snapshot(id) => self.root.join("snapshots").join(id),
        }
    }

    /// Path of a view's inventory file.
    #[must_use]
    pub fn inventory_path(&self, view: View<'_>) -> PathBuf {
        self.view_root(view).join(INVENTORY_FILE)
    }

    /// Path of one repository's fact file.
    #[must_use]
    pub fn fact_path(&self, view: View<'_>, repo: &str, domain: FactDomain) -> PathBuf {
        self.view_root(view).join("repos").join(repo_dir(repo)).join("raw").join(domain.file_name())
    }

    /// Directory receiving a repository's generated documents.
    #[must_use]
    pub fn docs_dir(&self, repo: &str) -> PathBuf {
        self.root.join("repos").join(repo_dir(repo)).join("docs")
    }

    /// Path of a top-level artifact such as `diff.json`.
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns `true` if a valid snapshot with this identifier exists.
    #[must_use]
    pub fn snapshot_exists(&self, id: &str) -> bool {
        self.ctx.fs.exists(&self.inventory_path(View::Snapshot(id)))
    }

    /// Writes text to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IntelError::Write`] if the filesystem rejects the write.
    pub fn write_text(&self, path: &Path, contents: &str) -> Result<(), IntelError> {
        self.ctx
            .fs
            .write(path, contents)
            .map_err(|e| IntelError::Write { path: path.to_path_buf(), message: e.to_string() })
    }

    /// Writes `value` as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), IntelError> {
        let json = to_pretty_json(&path.display().to_string(), value)?;
        self.write_text(path, &json)
    }

    /// Writes a view's inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_inventory(&self, view: View<'_>, inventory: &Inventory) -> Result<(), IntelError> {
        self.write_json(&self.inventory_path(view), inventory)
    }

    /// Writes every fact file of one repository into a view.
    ///
    /// # Errors
    ///
    /// Returns the first serialization or write failure.
    pub fn write_repo_facts(&self, view: View<'_>, repo: &RepoRawData) -> Result<(), IntelError> {
        let name = repo.metadata.name.as_str();
        for domain in FactDomain::ALL {
            let path = self.fact_path(view, name, domain);
            match domain {
                FactDomain::PackageSummary => self.write_json(&path, &repo.package_summary)?,
                FactDomain::Routes => self.write_json(&path, &repo.routes)?,
                FactDomain::ApiSurface => self.write_json(&path, &repo.api_surface)?,
                FactDomain::DomainTerms => self.write_json(&path, &repo.domain_terms)?,
                FactDomain::DbModels => self.write_json(&path, &repo.db_models)?,
                FactDomain::OutboundCalls => self.write_json(&path, &repo.outbound_calls)?,
                FactDomain::DependenciesExternal => {
                    self.write_json(&path, &repo.dependencies_external)?;
                }
                FactDomain::DependenciesInternal => {
                    self.write_json(&path, &repo.dependencies_internal)?;
                }
                FactDomain::EnvVars => self.write_json(&path, &repo.env_vars)?,
                FactDomain::QualitySignals => self.write_json(&path, &repo.quality_signals)?,
            }
        }
        Ok(())
    }

    /// Loads a view's inventory.
    ///
    /// # Errors
    ///
    /// Returns [`IntelError::MissingInventory`] for the current view or
    /// [`IntelError::MissingSnapshot`] for a snapshot when the file is absent,
    /// and [`IntelError::Read`] when it exists but does not parse.
    pub fn load_inventory(&self, view: View<'_>) -> Result<Inventory, IntelError> {
        let path = self.inventory_path(view);
        let Ok(raw) = self.ctx.fs.read_to_string(&path) else {
            return Err(match view {
                View::Current => IntelError::MissingInventory { path },
                View::Snapshot(id) => IntelError::MissingSnapshot { id: id.to_string(), path },
            });
        };
        serde_json::from_str(&raw).map_err(|e| IntelError::Read { path, message: e.to_string() })
    }

    /// Loads a fact file as untyped JSON, or `None` when missing or unparsable.
    #[must_use]
    pub fn load_fact_value(&self, view: View<'_>, repo: &str, domain: FactDomain) -> Option<Value> {
        let path = self.fact_path(view, repo, domain);
        let raw = self.ctx.fs.read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unparsable fact file");
                None
            }
        }
    }

    /// Loads a fact file as `T`, or `None` when missing or not of that shape.
    #[must_use]
    pub fn load_fact<T: DeserializeOwned>(
        &self,
        view: View<'_>,
        repo: &str,
        domain: FactDomain,
    ) -> Option<T> {
        let value = self.load_fact_value(view, repo, domain)?;
        serde_json::from_value(value).ok()
    }
}
