//! `repo-intel summarize` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::summarize;

/// Execute the `summarize` command.
///
/// # Errors
///
/// Returns an error if no scan has run, `repo` matches nothing, or a write
/// fails.
pub fn run(ctx: &ServiceContext, root: &Path, repo: Option<&str>) -> Result<String, IntelError> {
    let written = summarize::summarize(ctx, root, repo)?;
    Ok(format!("Generated docs for {} repo(s).", written.len()))
}
