//! `repo-intel diff` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::diff;
use crate::error::IntelError;

/// Execute the `diff` command.
///
/// # Errors
///
/// Returns an error if either snapshot is missing or a write fails.
pub fn run(ctx: &ServiceContext, root: &Path, base: &str, head: &str) -> Result<String, IntelError> {
    diff::run_diff(ctx, root, base, head)?;
    Ok(format!("Diff generated between {base} and {head}."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, MemFs};

    #[test]
    fn reports_both_snapshot_ids() {
        let ctx = test_context(MemFs::with_files([
            ("/w/.repo-intel/snapshots/a/inventory.json", r#"{"repos":[]}"#),
            ("/w/.repo-intel/snapshots/b/inventory.json", r#"{"repos":[]}"#),
        ]));
        let line = run(&ctx, Path::new("/w"), "a", "b").unwrap();
        assert_eq!(line, "Diff generated between a and b.");
    }
}
