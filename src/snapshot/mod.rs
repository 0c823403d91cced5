//! Snapshot orchestrator: discovers repositories, runs every extractor per
//! repository and persists the current view plus an immutable snapshot.
//!
//! Repositories are scanned concurrently as blocking tasks on a
//! current-thread tokio runtime. Within one repository the extractors that
//! only need the manifest summary run in parallel on scoped threads; the
//! dependency extractor and the domain ranker run afterwards because they
//! consume other extractors' output.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::IntelConfig;
use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::extract::{db, deps, domain, env, inventory, quality, routes};
use crate::model::{Inventory, PackageSummary, RepoMetadata, RepoRawData, ScanResult};
use crate::store::{validate_snapshot_id, SnapshotStore, View};
use crate::summarize::markdown_table;
use crate::survey::{discover_repo_roots, RepoTree};

/// Revision tag used when no version-control revision is available.
pub const NO_REVISION: &str = "nogit";

/// Formats a scan instant as RFC 3339 UTC with millisecond precision.
#[must_use]
pub fn format_generated_at(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the explicit identifier if non-empty, else `<revision>-<timestamp>`.
///
/// The timestamp is [`format_generated_at`] with `:` and `.` replaced by `-`.
#[must_use]
pub fn resolve_snapshot_id(
    ctx: &ServiceContext,
    root: &Path,
    explicit: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    let revision = ctx.git.head_revision(root).unwrap_or_else(|e| {
        debug!(root = %root.display(), error = %e, "no revision available");
        NO_REVISION.to_string()
    });
    let stamp = format_generated_at(now).replace([':', '.'], "-");
    format!("{revision}-{stamp}")
}

fn settle<T: Default>(what: &str, repo: &Path, handle: ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|_| {
        warn!(repo = %repo.display(), extractor = what, "extractor panicked, using empty facts");
        T::default()
    })
}

/// Runs every extractor over an already-surveyed repository.
#[must_use]
pub fn extract_repo(
    ctx: &ServiceContext,
    config: &IntelConfig,
    scan_root: &Path,
    tree: &RepoTree,
) -> RepoRawData {
    let package_summary = inventory::package_summary(ctx, tree);
    let metadata = inventory::repo_metadata(ctx, tree, scan_root, &package_summary);
    let sources = tree.source_files();
    let repo = tree.root.as_path();

    let (api_surface, db_models, env_vars, quality_signals) = thread::scope(|s| {
        let api = s.spawn(|| routes::extract_api_surface(ctx, tree, &sources, &package_summary));
        let models = s.spawn(|| db::extract_db_models(ctx, tree));
        let vars = s.spawn(|| env::extract_env_vars(ctx, tree, &sources));
        let signals = s.spawn(|| {
            quality::extract_quality_signals(ctx, tree, &sources, &package_summary, config)
        });
        (
            settle("api surface", repo, api),
            settle("db models", repo, models),
            settle("env vars", repo, vars),
            settle("quality signals", repo, signals),
        )
    });

    let (dependencies, domain_terms) = thread::scope(|s| {
        let links = s.spawn(|| {
            deps::extract_dependencies(ctx, tree, &sources, &package_summary, &env_vars, config)
        });
        let terms = s.spawn(|| {
            domain::extract_domain_terms(
                ctx,
                tree,
                &sources,
                &api_surface.routes,
                &db_models,
                &config.ranker,
            )
        });
        (settle("dependencies", repo, links), settle("domain terms", repo, terms))
    });

    debug!(
        repo = %metadata.name,
        files = tree.files.len(),
        routes = api_surface.routes.len(),
        "extracted repository facts"
    );

    RepoRawData {
        metadata,
        package_summary,
        routes: api_surface.routes.clone(),
        api_surface,
        domain_terms,
        db_models,
        outbound_calls: dependencies.outbound_calls,
        dependencies_external: dependencies.external,
        dependencies_internal: dependencies.internal,
        env_vars,
        quality_signals,
    }
}

/// Identity-only record for a repository whose extraction failed.
#[must_use]
pub fn degraded_repo(scan_root: &Path, repo_root: &Path) -> RepoRawData {
    let name = repo_root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    RepoRawData {
        metadata: RepoMetadata {
            name: name.clone(),
            root_path: repo_root.display().to_string(),
            relative_path: inventory::relative_path(repo_root, scan_root),
            package_manager: "unknown".to_string(),
            ..RepoMetadata::default()
        },
        package_summary: PackageSummary { name, ..PackageSummary::default() },
        ..RepoRawData::default()
    }
}

/// Runs `extract`, replacing a panic with [`degraded_repo`].
fn extract_guarded(
    scan_root: &Path,
    repo_root: &Path,
    extract: impl FnOnce() -> RepoRawData,
) -> RepoRawData {
    panic::catch_unwind(AssertUnwindSafe(extract)).unwrap_or_else(|_| {
        warn!(repo = %repo_root.display(), "repository extraction panicked, keeping identity only");
        degraded_repo(scan_root, repo_root)
    })
}

/// Surveys and extracts every repository concurrently, in root order.
///
/// A repository whose extraction panics is kept as a [`degraded_repo`].
///
/// # Errors
///
/// Returns [`IntelError::Runtime`] if a repository task cannot be joined.
pub async fn extract_all(
    ctx: Arc<ServiceContext>,
    config: Arc<IntelConfig>,
    scan_root: PathBuf,
    repo_roots: Vec<PathBuf>,
) -> Result<Vec<RepoRawData>, IntelError> {
    let mut tasks = JoinSet::new();
    for (index, repo_root) in repo_roots.into_iter().enumerate() {
        let ctx = Arc::clone(&ctx);
        let config = Arc::clone(&config);
        let scan_root = scan_root.clone();
        tasks.spawn_blocking(move || {
            let repo = extract_guarded(&scan_root, &repo_root, || {
                let tree = RepoTree::survey(&repo_root, &config.extra_ignored_dirs);
                extract_repo(&ctx, &config, &scan_root, &tree)
            });
            (index, repo)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.map_err(|e| IntelError::Runtime(e.to_string()))?);
    }
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, repo)| repo).collect())
}

/// Renders the inventory as a markdown table.
#[must_use]
pub fn render_inventory_markdown(inventory: &Inventory) -> String {
    let or_dash = |items: &[String]| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };
    let rows: Vec<Vec<String>> = inventory
        .repos
        .iter()
        .map(|repo| {
            vec![
                repo.name.clone(),
                repo.repo_type.as_str().to_string(),
                or_dash(&repo.languages),
                or_dash(&repo.frameworks),
                repo.package_manager.clone(),
                or_dash(&repo.owner_team),
            ]
        })
        .collect();
    let table = markdown_table(
        &["Repo", "Type", "Languages", "Frameworks", "Package Manager", "Owner Team"],
        &rows,
    );
    format!("# Repository Inventory\n\nGenerated at: {}\n\n{table}\n", inventory.generated_at)
}

/// Writes the current view, then the snapshot facts, then the snapshot
/// inventory that marks the snapshot valid.
///
/// # Errors
///
/// Returns the first serialization or write failure.
pub fn persist(store: &SnapshotStore<'_>, result: &ScanResult) -> Result<(), IntelError> {
    let id = result.inventory.snapshot_id.as_str();
    store.write_inventory(View::Current, &result.inventory)?;
    store.write_text(
        &store.artifact_path("inventory.md"),
        &render_inventory_markdown(&result.inventory),
    )?;
    for repo in &result.repos {
        store.write_repo_facts(View::Current, repo)?;
    }
    for repo in &result.repos {
        store.write_repo_facts(View::Snapshot(id), repo)?;
    }
    store.write_inventory(View::Snapshot(id), &result.inventory)
}

/// Scans the workspace at `root` and persists the result.
///
/// # Errors
///
/// Returns [`IntelError::Config`] for a malformed configuration,
/// [`IntelError::InvalidSnapshotId`] for an identifier that is not a single
/// path segment, [`IntelError::SnapshotExists`] when the snapshot identifier is already
/// taken, and any persistence failure.
pub async fn scan(
    ctx: Arc<ServiceContext>,
    root: PathBuf,
    snapshot_id: Option<String>,
) -> Result<ScanResult, IntelError> {
    let config = Arc::new(IntelConfig::load(&ctx, &root)?);
    let now = ctx.clock.now();
    let id = resolve_snapshot_id(&ctx, &root, snapshot_id.as_deref(), now);
    validate_snapshot_id(&id)?;

    {
        let store = SnapshotStore::new(&ctx, &root);
        if store.snapshot_exists(&id) {
            return Err(IntelError::SnapshotExists { id });
        }
    }

    let repo_roots = discover_repo_roots(&root, &config.extra_ignored_dirs);
    info!(root = %root.display(), snapshot = %id, repos = repo_roots.len(), "scanning workspace");

    let repos = extract_all(Arc::clone(&ctx), config, root.clone(), repo_roots).await?;
    let result = ScanResult {
        inventory: Inventory {
            generated_at: format_generated_at(now),
            scan_root: root.display().to_string(),
            snapshot_id: id,
            repos: repos.iter().map(|r| r.metadata.clone()).collect(),
        },
        repos,
    };

    persist(&SnapshotStore::new(&ctx, &root), &result)?;
    Ok(result)
}

/// Blocking entry point: runs [`scan`] on a current-thread runtime.
///
/// # Errors
///
/// Returns [`IntelError::Runtime`] if the runtime cannot start, otherwise
/// whatever [`scan`] returns.
pub fn run_scan(
    ctx: Arc<ServiceContext>,
    root: PathBuf,
    snapshot_id: Option<String>,
) -> Result<ScanResult, IntelError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| IntelError::Runtime(e.to_string()))?;
    runtime.block_on(scan(ctx, root, snapshot_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, test_instant, FixedGit, MemFs};
    use crate::model::{RepoMetadata, RepoType};
    use crate::store::FactDomain;

    #[test]
    fn explicit_snapshot_id_wins() {
        let ctx = test_context(MemFs::default());
        let id = resolve_snapshot_id(&ctx, Path::new("/w"), Some("base"), test_instant());
        assert_eq!(id, "base");
    }

    #[test]
    fn derived_id_falls_back_to_sentinel_revision() {
        let ctx = test_context(MemFs::default());
        let id = resolve_snapshot_id(&ctx, Path::new("/w"), Some("  "), test_instant());
        assert_eq!(id, "nogit-2025-06-15T10-00-00-000Z");
    }

    #[test]
    fn derived_id_uses_revision_when_available() {
        let mut ctx = test_context(MemFs::default());
        ctx.git = Box::new(FixedGit(Some("0123456789ab")));
        let id = resolve_snapshot_id(&ctx, Path::new("/w"), None, test_instant());
        assert_eq!(id, "0123456789ab-2025-06-15T10-00-00-000Z");
    }

    #[test]
    fn extract_repo_classifies_express_service() {
        let ctx = test_context(MemFs::with_files([
            ("/w/orders/package.json", r#"{"name":"orders","dependencies":{"express":"4"}}"#),
            ("/w/orders/src/server.ts", "app.get('/orders', (req, res) => res.json([]));"),
        ]));
        let tree = RepoTree::from_files(Path::new("/w/orders"), &["package.json", "src/server.ts"]);
        let repo = extract_repo(&ctx, &IntelConfig::default(), Path::new("/w"), &tree);
        assert_eq!(repo.metadata.repo_type, RepoType::Service);
        assert_eq!(repo.routes.len(), 1);
        assert_eq!(repo.routes, repo.api_surface.routes);
        assert_eq!((repo.routes[0].method.as_str(), repo.routes[0].path.as_str()), ("GET", "/orders"));
        assert!(repo.domain_terms.top_terms.iter().any(|t| t.term == "orders"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let ctx = test_context(MemFs::with_files([
            ("/w/r/package.json", r#"{"name":"r","dependencies":{"@acme/a":"1","pg":"8"}}"#),
            ("/w/r/src/a.ts", "import b from './b'; fetch('https://x.example.com/a');"),
            ("/w/r/src/b.ts", "import a from './a'; const u = process.env.ORDERS_SVC_URL;"),
        ]));
        let tree = RepoTree::from_files(Path::new("/w/r"), &["package.json", "src/a.ts", "src/b.ts"]);
        let first = extract_repo(&ctx, &IntelConfig::default(), Path::new("/w"), &tree);
        let second = extract_repo(&ctx, &IntelConfig::default(), Path::new("/w"), &tree);
        assert_eq!(first, second);
        assert_eq!(first.quality_signals.cycles, vec!["src/a.ts -> src/b.ts -> src/a.ts"]);
    }

    #[test]
    fn panicking_extraction_keeps_repository_identity() {
        let repo = extract_guarded(Path::new("/w"), Path::new("/w/services/orders"), || {
            panic!("extractor failure")
        });
        assert_eq!(repo.metadata.name, "orders");
        assert_eq!(repo.metadata.relative_path, "services/orders");
        assert_eq!(repo.metadata.repo_type, RepoType::Unknown);
        assert!(repo.routes.is_empty());

        let fine = extract_guarded(Path::new("/w"), Path::new("/w/a"), RepoRawData::default);
        assert_eq!(fine, RepoRawData::default());
    }

    #[test]
    fn degenerate_manifest_and_sources_still_extract() {
        let ctx = test_context(MemFs::with_files([
            ("/w/odd/package.json", r#"{"name":42,"dependencies":["express"],"scripts":null}"#),
            ("/w/odd/src/a.ts", ""),
            ("/w/odd/prisma/schema.prisma", "model {\n  @relation(\n"),
        ]));
        let tree = RepoTree::from_files(
            Path::new("/w/odd"),
            &["package.json", "src/a.ts", "src/missing.ts", "prisma/schema.prisma"],
        );
        let repo = extract_repo(&ctx, &IntelConfig::default(), Path::new("/w"), &tree);
        assert_eq!(repo.metadata.name, "odd");
        assert_eq!(repo.metadata.repo_type, RepoType::Unknown);
        assert!(repo.dependencies_external.databases.is_empty());
        assert!(repo.routes.is_empty());
    }

    #[test]
    fn persist_writes_snapshot_inventory_last() {
        let ctx = test_context(MemFs::default());
        let store = SnapshotStore::new(&ctx, Path::new("/w"));
        let result = ScanResult {
            inventory: Inventory {
                snapshot_id: "base".into(),
                repos: vec![RepoMetadata { name: "orders".into(), ..RepoMetadata::default() }],
                ..Inventory::default()
            },
            repos: vec![RepoRawData {
                metadata: RepoMetadata { name: "orders".into(), ..RepoMetadata::default() },
                ..RepoRawData::default()
            }],
        };
        persist(&store, &result).unwrap();
        assert!(store.snapshot_exists("base"));
        let current = ctx
            .fs
            .read_to_string(&store.fact_path(View::Current, "orders", FactDomain::ApiSurface))
            .unwrap();
        let snap = ctx
            .fs
            .read_to_string(&store.fact_path(View::Snapshot("base"), "orders", FactDomain::ApiSurface))
            .unwrap();
        assert_eq!(current, snap);
        let md = ctx.fs.read_to_string(&store.artifact_path("inventory.md")).unwrap();
        assert!(md.contains("| orders | unknown | - | - |"));
    }

    #[test]
    fn inventory_markdown_lists_each_repo() {
        let inventory = Inventory {
            generated_at: "2025-06-15T10:00:00.000Z".into(),
            repos: vec![RepoMetadata {
                name: "orders".into(),
                repo_type: RepoType::Service,
                languages: vec!["TypeScript".into()],
                package_manager: "pnpm".into(),
                ..RepoMetadata::default()
            }],
            ..Inventory::default()
        };
        let md = render_inventory_markdown(&inventory);
        assert!(md.starts_with("# Repository Inventory\n\nGenerated at: 2025-06-15T10:00:00.000Z"));
        assert!(md.contains("| orders | service | TypeScript | - | pnpm | - |"));
    }
}
