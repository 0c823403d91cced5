//! File system surveyor: repository discovery and per-repository file listing.
//!
//! Traversal is read-only and uses `walkdir` directly; everything downstream
//! consumes the pre-enumerated [`RepoTree`] and reads contents through the
//! filesystem port.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Workspace-local state directory holding inventories and snapshots.
pub const STATE_DIR: &str = ".repo-intel";

/// Directory names never descended into.
const ALWAYS_IGNORED: &[&str] = &["node_modules", ".git", STATE_DIR];

/// Build output directories excluded from source listings.
const BUILD_DIRS: &[&str] = &["dist", "build", "coverage"];

/// Extensions treated as JavaScript/TypeScript source.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn is_ignored(entry: &DirEntry, extra_ignored: &[String]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    ALWAYS_IGNORED.contains(&name.as_ref()) || extra_ignored.iter().any(|d| d == name.as_ref())
}

fn is_skipped(entry: &DirEntry, extra_ignored: &[String]) -> bool {
    is_ignored(entry, extra_ignored)
        || (entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.'))
}

/// Finds every repository root under `scan_root`.
///
/// A repository root is a directory holding a `.git` entry; the scan root
/// itself qualifies. Hidden directories are searched too. The result is
/// deduplicated and sorted.
#[must_use]
pub fn discover_repo_roots(scan_root: &Path, extra_ignored: &[String]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = WalkDir::new(scan_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_type().is_dir() && !is_ignored(e, extra_ignored))
        .filter_map(Result::ok)
        .filter(|e| e.path().join(".git").exists())
        .map(DirEntry::into_path)
        .collect();
    roots.sort();
    roots.dedup();
    debug!(root = %scan_root.display(), count = roots.len(), "discovered repositories");
    roots
}

/// Joins the components of a relative path with `/`.
fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pre-enumerated file tree of one repository.
///
/// All paths are repository-relative, `/`-separated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoTree {
    /// Absolute repository root.
    pub root: PathBuf,
    /// Every non-ignored file.
    pub files: Vec<String>,
    /// Every non-ignored directory below the root.
    pub dirs: Vec<String>,
}

impl RepoTree {
    /// Walks `root`, skipping hidden entries, dependency caches, the state
    /// directory and `extra_ignored` names. Unreadable entries are skipped.
    #[must_use]
    pub fn survey(root: &Path, extra_ignored: &[String]) -> Self {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped(e, extra_ignored))
            .filter_map(Result::ok)
        {
            if entry.depth() == 0 {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = to_slash_path(rel);
            if entry.file_type().is_dir() {
                dirs.push(rel);
            } else if entry.file_type().is_file() {
                files.push(rel);
            }
        }
        files.sort();
        dirs.sort();
        Self { root: root.to_path_buf(), files, dirs }
    }

    /// Builds a tree from a file list, deriving directories from the paths.
    #[must_use]
    pub fn from_files<S: AsRef<str>>(root: &Path, files: &[S]) -> Self {
        let mut files: Vec<String> = files.iter().map(|f| f.as_ref().to_string()).collect();
        files.sort();
        files.dedup();
        let mut dirs: Vec<String> = files
            .iter()
            .flat_map(|f| {
                let parts: Vec<&str> = f.split('/').collect();
                (1..parts.len()).map(move |n| parts[..n].join("/"))
            })
            .collect();
        dirs.sort();
        dirs.dedup();
        Self { root: root.to_path_buf(), files, dirs }
    }

    /// Absolute path of a repository-relative file.
    #[must_use]
    pub fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Directory names directly under the root, sorted.
    #[must_use]
    pub fn top_level_folders(&self) -> Vec<String> {
        self.dirs.iter().filter(|d| !d.contains('/')).cloned().collect()
    }

    /// JavaScript/TypeScript sources outside build output directories.
    #[must_use]
    pub fn source_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| has_extension(f, SOURCE_EXTENSIONS) && !in_any_dir(f, BUILD_DIRS))
            .cloned()
            .collect()
    }

    /// Files whose extension is one of `exts`.
    #[must_use]
    pub fn files_with_extension(&self, exts: &[&str]) -> Vec<&str> {
        self.files.iter().filter(|f| has_extension(f, exts)).map(String::as_str).collect()
    }
}

/// Returns the lower-cased extension of a `/`-separated path, if any.
#[must_use]
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Returns `true` if the path's extension is one of `exts`.
#[must_use]
pub fn has_extension(path: &str, exts: &[&str]) -> bool {
    extension(path).is_some_and(|ext| exts.contains(&ext.as_str()))
}

/// Returns `true` if any directory segment of `path` is one of `names`.
#[must_use]
pub fn in_any_dir(path: &str, names: &[&str]) -> bool {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    segments.iter().any(|s| names.contains(s))
}
