//! Environment variable references.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ServiceContext;
use crate::extract::text::unique_sorted;
use crate::model::EnvSummary;
use crate::survey::RepoTree;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:process\.env|import\.meta\.env)(?:\.([A-Z0-9_]+)|\[\s*['"`]([A-Z0-9_]+)['"`]\s*\])"#,
    )
    .expect("valid env reference regex")
});

const ENDPOINT_MARKERS: &[&str] = &["URL", "HOST", "ENDPOINT", "BASE"];

/// Returns `true` if a variable name looks like it holds an endpoint.
#[must_use]
pub fn is_endpoint_like(name: &str) -> bool {
    ENDPOINT_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Names referenced in one source text, in match order.
fn referenced_names(code: &str) -> impl Iterator<Item = String> + '_ {
    ENV_REFERENCE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string()))
}

/// Collects every environment variable referenced by the source files.
#[must_use]
pub fn extract_env_vars(ctx: &ServiceContext, tree: &RepoTree, source_files: &[String]) -> EnvSummary {
    let all = unique_sorted(source_files.iter().flat_map(|file| {
        let code = ctx.fs.read_or_empty(&tree.abs(file));
        referenced_names(&code).collect::<Vec<_>>()
    }));
    let endpoint_like = all.iter().filter(|name| is_endpoint_like(name)).cloned().collect();
    EnvSummary { all, endpoint_like }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::testing::{test_context, MemFs};

    #[test]
    fn collects_dot_bracket_and_vite_references() {
        let ctx = test_context(MemFs::with_files([
            ("/r/src/a.ts", "const u = process.env.ORDERS_SVC_URL;\nconst p = process.env['PORT'];"),
            ("/r/src/b.tsx", "import.meta.env.VITE_API_BASE; process.env.PORT; process.env.lower"),
        ]));
        let files = vec!["src/a.ts".to_string(), "src/b.tsx".to_string()];
        let tree = RepoTree::from_files(Path::new("/r"), &files);
        let env = extract_env_vars(&ctx, &tree, &files);
        assert_eq!(env.all, vec!["ORDERS_SVC_URL", "PORT", "VITE_API_BASE"]);
        assert_eq!(env.endpoint_like, vec!["ORDERS_SVC_URL", "VITE_API_BASE"]);
    }

    #[test]
    fn unreadable_files_contribute_nothing() {
        let ctx = test_context(MemFs::default());
        let files = vec!["src/missing.ts".to_string()];
        let tree = RepoTree::from_files(Path::new("/r"), &files);
        assert_eq!(extract_env_vars(&ctx, &tree, &files), EnvSummary::default());
    }
}
