//! Command dispatch and handlers.
//!
//! Each handler returns the one-line summary printed on stdout; logs go to
//! stderr through `tracing`.

pub mod diff;
pub mod graph;
pub mod scan;
pub mod summarize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::error::IntelError;

/// Dispatch a parsed command to its handler using live adapters.
///
/// # Errors
///
/// Returns the rendered error message if the selected handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let ctx = Arc::new(ServiceContext::live());
    let summary = dispatch_with_context(command, ctx).map_err(|e| e.to_string())?;
    println!("{summary}");
    Ok(())
}

/// Dispatch a command with the given service context, returning its summary line.
///
/// # Errors
///
/// Returns the handler's error.
pub fn dispatch_with_context(
    command: &Command,
    ctx: Arc<ServiceContext>,
) -> Result<String, IntelError> {
    match command {
        Command::Scan { root, snapshot_id } => {
            scan::run(ctx, &resolve_root(root)?, snapshot_id.clone())
        }
        Command::Summarize { root, repo } => {
            summarize::run(&ctx, &resolve_root(root)?, repo.as_deref())
        }
        Command::Graph { root } => graph::run(&ctx, &resolve_root(root)?),
        Command::Diff { root, base, head } => diff::run(&ctx, &resolve_root(root)?, base, head),
    }
}

/// Makes `root` absolute against the working directory without touching the
/// filesystem.
fn resolve_root(root: &Path) -> Result<PathBuf, IntelError> {
    std::path::absolute(root)
        .map_err(|e| IntelError::Read { path: root.to_path_buf(), message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, MemFs};

    #[test]
    fn resolve_root_keeps_absolute_paths() {
        assert_eq!(resolve_root(Path::new("/w")).unwrap(), PathBuf::from("/w"));
        assert!(resolve_root(Path::new(".")).unwrap().is_absolute());
    }

    #[test]
    fn graph_before_scan_reports_missing_inventory() {
        let ctx = Arc::new(test_context(MemFs::default()));
        let err = dispatch_with_context(&Command::Graph { root: PathBuf::from("/w") }, ctx)
            .unwrap_err();
        assert!(err.to_string().contains("run scan first"));
    }
}
