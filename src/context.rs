//! Service context bundling all port trait objects.

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::git::LiveGitRepo;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::git::GitRepo;

/// Bundles all port trait objects into a single context.
///
/// The context is immutable once built and every port is `Send + Sync`, so a
/// single context is shared by all per-repository scan tasks.
pub struct ServiceContext {
    /// Clock for scan and diff timestamps.
    pub clock: Box<dyn Clock>,
    /// Filesystem for reading repository files and persisting artifacts.
    pub fs: Box<dyn FileSystem>,
    /// Revision lookup used to derive snapshot identifiers.
    pub git: Box<dyn GitRepo>,
}

impl ServiceContext {
    /// Creates a live context with real adapters for every port.
    #[must_use]
    pub fn live() -> Self {
        Self { clock: Box::new(LiveClock), fs: Box::new(LiveFileSystem), git: Box::new(LiveGitRepo) }
    }
}

/// In-memory port doubles shared by unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};

    use super::ServiceContext;
    use crate::ports::{Clock, FileSystem, GitRepo};

    /// In-memory filesystem keyed by absolute path.
    #[derive(Default)]
    pub struct MemFs {
        files: Mutex<BTreeMap<PathBuf, String>>,
    }

    impl MemFs {
        /// Builds a filesystem pre-populated with `(path, contents)` pairs.
        pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
            let fs = Self::default();
            {
                let mut map = fs.files.lock().unwrap();
                for (path, contents) in files {
                    map.insert(PathBuf::from(path), contents.to_string());
                }
            }
            fs
        }
    }

    impl FileSystem for MemFs {
        fn read_to_string(
            &self,
            path: &Path,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            let files = self.files.lock().unwrap();
            files
                .get(path)
                .cloned()
                .ok_or_else(|| format!("File not found: {}", path.display()).into())
        }

        fn write(
            &self,
            path: &Path,
            contents: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let mut files = self.files.lock().unwrap();
            files.insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            let files = self.files.lock().unwrap();
            files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
        }

        fn list_dir(
            &self,
            path: &Path,
        ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
            let files = self.files.lock().unwrap();
            let mut names: Vec<String> = files
                .keys()
                .filter_map(|k| {
                    let rest = k.strip_prefix(path).ok()?;
                    rest.components()
                        .next()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                })
                .collect();
            names.sort();
            names.dedup();
            Ok(names)
        }
    }

    /// Clock pinned to a single instant.
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Revision source that always returns the same revision, or always fails.
    pub struct FixedGit(pub Option<&'static str>);

    impl GitRepo for FixedGit {
        fn head_revision(
            &self,
            _root: &Path,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            self.0.map(str::to_string).ok_or_else(|| "not a git repository".into())
        }
    }

    /// The instant every test clock reports.
    pub fn test_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()
    }

    /// Builds a context over `fs` with a fixed clock and no revision.
    pub fn test_context(fs: MemFs) -> ServiceContext {
        ServiceContext {
            clock: Box::new(FixedClock(test_instant())),
            fs: Box::new(fs),
            git: Box::new(FixedGit(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::testing::{test_context, FixedGit, MemFs};

    #[test]
    fn mem_fs_lists_direct_children_only() {
        let ctx = test_context(MemFs::with_files([
            ("/r/.github/workflows/ci.yml", "on: push"),
            ("/r/.github/workflows/nested/x.yml", ""),
        ]));
        let names = ctx.fs.list_dir(Path::new("/r/.github/workflows")).unwrap();
        assert_eq!(names, vec!["ci.yml", "nested"]);
    }

    #[test]
    fn fixed_git_without_revision_fails() {
        let mut ctx = test_context(MemFs::default());
        assert!(ctx.git.head_revision(Path::new("/r")).is_err());
        ctx.git = Box::new(FixedGit(Some("abc123def456")));
        assert_eq!(ctx.git.head_revision(Path::new("/r")).unwrap(), "abc123def456");
    }
}
