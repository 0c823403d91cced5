//! `repo-intel graph` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::graph;

/// Execute the `graph` command.
///
/// # Errors
///
/// Returns an error if no scan has run or the map cannot be written.
pub fn run(ctx: &ServiceContext, root: &Path) -> Result<String, IntelError> {
    let path = graph::generate_service_map(ctx, root)?;
    Ok(format!("Generated service map: {}", path.display()))
}
