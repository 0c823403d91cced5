//! Code-quality signals: tests, CI, lint/format, strict typing, hotspots,
//! folder depth, import cycles and observability evidence.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::config::IntelConfig;
use crate::context::ServiceContext;
use crate::extract::cycles::detect_cycles;
use crate::extract::text::unique_sorted;
use crate::model::{HotspotFile, PackageSummary, QualitySignals};
use crate::survey::{extension, has_extension, in_any_dir, RepoTree};

const TEST_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];
const HOTSPOT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py", "go", "java", "rb", "rs"];

const LINT_CONFIGS: &[&str] = &[
    ".eslintrc",
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".eslintrc.json",
    ".eslintrc.yml",
    "eslint.config.js",
    "eslint.config.mjs",
    "biome.json",
];

const FORMAT_CONFIGS: &[&str] =
    &[".prettierrc", ".prettierrc.json", ".prettierrc.js", "prettier.config.js"];

static OBSERVABILITY_RULES: LazyLock<Vec<(Signal, Regex)>> = LazyLock::new(|| {
    [
        (Signal::Log, r"(pino|winston|logger\.|console\.log)"),
        (Signal::Metrics, r"(prom-client|/metrics|meter)"),
        (Signal::Tracing, r"(opentelemetry|traceparent|span)"),
    ]
    .into_iter()
    .map(|(signal, pattern)| (signal, Regex::new(pattern).expect("valid observability regex")))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Log,
    Metrics,
    Tracing,
}

impl Signal {
    fn label(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Metrics => "metrics",
            Self::Tracing => "tracing",
        }
    }
}

/// Returns `true` for `*.test.*` / `*.spec.*` sources and anything under `__tests__`.
#[must_use]
pub fn is_test_file(path: &str) -> bool {
    if in_any_dir(path, &["__tests__"]) {
        return true;
    }
    if !has_extension(path, TEST_EXTENSIONS) {
        return false;
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    stem.ends_with(".test") || stem.ends_with(".spec")
}

fn ci_configured(ctx: &ServiceContext, tree: &RepoTree) -> bool {
    let workflows = ctx.fs.list_dir(&tree.abs(".github/workflows")).unwrap_or_default();
    workflows.iter().any(|name| matches!(extension(name).as_deref(), Some("yml" | "yaml")))
        || !ctx.fs.read_or_empty(&tree.abs(".gitlab-ci.yml")).is_empty()
}

fn any_exists(ctx: &ServiceContext, tree: &RepoTree, names: &[&str]) -> bool {
    names.iter().any(|name| ctx.fs.exists(&tree.abs(name)))
}

fn typescript_strict(ctx: &ServiceContext, tree: &RepoTree) -> bool {
    let raw = ctx.fs.read_or_empty(&tree.abs("tsconfig.json"));
    serde_json::from_str::<Value>(&raw)
        .ok()
        .and_then(|config| config.get("compilerOptions")?.get("strict")?.as_bool())
        .unwrap_or(false)
}

fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

fn largest_files(ctx: &ServiceContext, tree: &RepoTree, limit: usize) -> Vec<HotspotFile> {
    let mut measured: Vec<HotspotFile> = tree
        .files_with_extension(HOTSPOT_EXTENSIONS)
        .into_iter()
        .filter(|file| !in_any_dir(file, &["dist", "build"]))
        .map(|file| HotspotFile {
            file: file.to_string(),
            lines: line_count(&ctx.fs.read_or_empty(&tree.abs(file))),
        })
        .collect();
    measured.sort_by(|a, b| b.lines.cmp(&a.lines));
    measured.truncate(limit);
    measured
}

fn deepest_folders(tree: &RepoTree, limit: usize) -> Vec<String> {
    let mut dirs: Vec<(&String, usize)> =
        tree.dirs.iter().map(|d| (d, d.split('/').filter(|s| !s.is_empty()).count())).collect();
    dirs.sort_by(|a, b| b.1.cmp(&a.1));
    dirs.into_iter().take(limit).map(|(d, _)| d.clone()).collect()
}

fn observability(contents: &[(String, String)], signal: Signal) -> Vec<String> {
    let Some((_, regex)) = OBSERVABILITY_RULES.iter().find(|(s, _)| *s == signal) else {
        return Vec::new();
    };
    unique_sorted(
        contents
            .iter()
            .filter(|(_, code)| regex.is_match(code))
            .map(|(file, _)| format!("{}:{file}", signal.label())),
    )
}

/// Computes quality signals for one repository.
#[must_use]
pub fn extract_quality_signals(
    ctx: &ServiceContext,
    tree: &RepoTree,
    source_files: &[String],
    pkg: &PackageSummary,
    config: &IntelConfig,
) -> QualitySignals {
    let contents: Vec<(String, String)> = source_files
        .iter()
        .map(|file| (file.clone(), ctx.fs.read_or_empty(&tree.abs(file))))
        .collect();

    let test_file_count = tree.files.iter().filter(|f| is_test_file(f)).count();
    let scripts = &pkg.scripts;

    QualitySignals {
        tests_present: test_file_count > 0,
        test_file_count,
        ci_configured: ci_configured(ctx, tree),
        lint_configured: scripts.contains_key("lint") || any_exists(ctx, tree, LINT_CONFIGS),
        format_configured: scripts.contains_key("format")
            || scripts.contains_key("prettier")
            || any_exists(ctx, tree, FORMAT_CONFIGS),
        typescript_strict: typescript_strict(ctx, tree),
        largest_files: largest_files(ctx, tree, config.hotspot_limit),
        deepest_folders: deepest_folders(tree, config.deepest_limit),
        cycles: detect_cycles(&contents),
        logging_signals: observability(&contents, Signal::Log),
        metrics_signals: observability(&contents, Signal::Metrics),
        tracing_signals: observability(&contents, Signal::Tracing),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::testing::{test_context, MemFs};

    #[test]
    fn test_file_conventions() {
        assert!(is_test_file("src/orders.test.ts"));
        assert!(is_test_file("src/orders.spec.jsx"));
        assert!(is_test_file("src/__tests__/fixtures.json"));
        assert!(!is_test_file("src/test-utils.ts"));
        assert!(!is_test_file("src/orders.test.py"));
    }

    #[test]
    fn flags_come_from_scripts_and_config_files() {
        let ctx = test_context(MemFs::with_files([
            ("/r/.github/workflows/ci.yaml", "on: push"),
            ("/r/.prettierrc", "{}"),
            ("/r/tsconfig.json", r#"{"compilerOptions": {"strict": true}}"#),
            ("/r/src/a.test.ts", "test('x', () => {});"),
        ]));
        let tree = RepoTree::from_files(Path::new("/r"), &["src/a.test.ts", "tsconfig.json"]);
        let pkg = PackageSummary {
            scripts: [("lint".to_string(), "eslint .".to_string())].into_iter().collect(),
            ..PackageSummary::default()
        };
        let files = vec!["src/a.test.ts".to_string()];
        let q = extract_quality_signals(&ctx, &tree, &files, &pkg, &IntelConfig::default());
        assert!(q.tests_present);
        assert_eq!(q.test_file_count, 1);
        assert!(q.ci_configured);
        assert!(q.lint_configured);
        assert!(q.format_configured);
        assert!(q.typescript_strict);
    }

    #[test]
    fn missing_inputs_degrade_to_false() {
        let ctx = test_context(MemFs::with_files([("/r/tsconfig.json", "{ // comments break json")]));
        let tree = RepoTree::from_files(Path::new("/r"), &["tsconfig.json"]);
        let q = extract_quality_signals(&ctx, &tree, &[], &PackageSummary::default(), &IntelConfig::default());
        assert!(!q.tests_present);
        assert!(!q.ci_configured);
        assert!(!q.lint_configured);
        assert!(!q.format_configured);
        assert!(!q.typescript_strict);
    }

    #[test]
    fn hotspots_and_depth_are_ranked_stably() {
        let ctx = test_context(MemFs::with_files([
            ("/r/a.ts", "1\n2\n3"),
            ("/r/b.ts", "1\n2\n3"),
            ("/r/c/d/e.go", "1\n2\n3\n4"),
            ("/r/dist/big.js", "1\n2\n3\n4\n5\n6"),
        ]));
        let tree = RepoTree::from_files(Path::new("/r"), &["a.ts", "b.ts", "c/d/e.go", "dist/big.js"]);
        let config = IntelConfig { hotspot_limit: 2, deepest_limit: 2, ..IntelConfig::default() };
        let q = extract_quality_signals(&ctx, &tree, &[], &PackageSummary::default(), &config);
        let hot: Vec<(&str, usize)> = q.largest_files.iter().map(|h| (h.file.as_str(), h.lines)).collect();
        assert_eq!(hot, vec![("c/d/e.go", 4), ("a.ts", 3)]);
        assert_eq!(q.deepest_folders, vec!["c/d", "c"]);
    }

    #[test]
    fn observability_signals_are_prefixed_per_file() {
        let ctx = test_context(MemFs::with_files([
            ("/r/src/log.ts", "import pino from 'pino';"),
            ("/r/src/otel.ts", "tracer.startSpan('x'); // span"),
            ("/r/src/plain.ts", "export const x = 1;"),
        ]));
        let files: Vec<String> =
            ["src/log.ts", "src/otel.ts", "src/plain.ts"].iter().map(|s| (*s).to_string()).collect();
        let tree = RepoTree::from_files(Path::new("/r"), &files);
        let q = extract_quality_signals(&ctx, &tree, &files, &PackageSummary::default(), &IntelConfig::default());
        assert_eq!(q.logging_signals, vec!["log:src/log.ts"]);
        assert_eq!(q.tracing_signals, vec!["tracing:src/otel.ts"]);
        assert!(q.metrics_signals.is_empty());
    }
}
