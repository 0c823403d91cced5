//! Filesystem port for file I/O operations.

use std::path::Path;

use tracing::debug;

/// Provides filesystem access for reading and writing files.
///
/// Extractors read repository files through this port and the snapshot store
/// writes through it, so both can be exercised against an in-memory double.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating parent directories and
    /// overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Reads a file, treating any failure as an empty file.
    ///
    /// Extractors use this for optional inputs: a missing or unreadable file
    /// is "no evidence", never an error. A file that exists but cannot be
    /// read (permissions, invalid UTF-8) is logged at debug level.
    fn read_or_empty(&self, path: &Path) -> String {
        match self.read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if self.exists(path) {
                    debug!(path = %path.display(), error = %e, "unreadable file treated as empty");
                }
                String::new()
            }
        }
    }
}
