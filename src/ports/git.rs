//! Version-control port used to tag snapshots with a revision.

use std::path::Path;

/// Provides read access to the revision of a working tree.
pub trait GitRepo: Send + Sync {
    /// Returns the abbreviated HEAD revision of the repository at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not inside a repository, the repository
    /// has no commits, or the version-control tool is unavailable.
    fn head_revision(&self, root: &Path) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
