//! Live git adapter using `git` CLI commands.

use std::path::Path;
use std::process::Command;

use crate::ports::git::GitRepo;

/// Length of the abbreviated revision used in snapshot identifiers.
const SHORT_REVISION_LEN: usize = 12;

/// Live git adapter that shells out to the `git` CLI.
pub struct LiveGitRepo;

impl GitRepo for LiveGitRepo {
    fn head_revision(
        &self,
        root: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["rev-parse", &format!("--short={SHORT_REVISION_LEN}"), "HEAD"])
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git rev-parse HEAD failed: {}", stderr.trim()).into());
        }
        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if revision.is_empty() {
            return Err("git rev-parse HEAD returned no revision".into());
        }
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_repository_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LiveGitRepo.head_revision(dir.path());
        assert!(result.is_err());
    }
}
