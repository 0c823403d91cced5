//! `repo-intel scan` command.

use std::path::Path;
use std::sync::Arc;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::snapshot;

/// Execute the `scan` command.
///
/// # Errors
///
/// Returns an error if configuration is malformed, the snapshot identifier
/// is taken, or persistence fails.
pub fn run(
    ctx: Arc<ServiceContext>,
    root: &Path,
    snapshot_id: Option<String>,
) -> Result<String, IntelError> {
    let result = snapshot::run_scan(ctx, root.to_path_buf(), snapshot_id)?;
    Ok(format!(
        "Scanned {} repo(s). Snapshot: {}",
        result.inventory.repos.len(),
        result.inventory.snapshot_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, MemFs};

    #[test]
    fn empty_workspace_scans_zero_repos() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(MemFs::default()));
        let line = run(ctx, dir.path(), Some("base".into())).unwrap();
        assert_eq!(line, "Scanned 0 repo(s). Snapshot: base");
    }
}
