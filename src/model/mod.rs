//! Fact structures produced by the extractors and persisted in snapshots.
//!
//! Every structure serializes with camelCase field names and deserializes
//! leniently (`#[serde(default)]`): a persisted artifact with missing fields
//! still loads, with the missing parts empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coarse classification of what a repository is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepoType {
    /// Long-running network service.
    Service,
    /// Reusable package.
    Library,
    /// Infrastructure definitions.
    Infra,
    /// Browser-facing application.
    Frontend,
    /// Background job processor.
    Worker,
    /// Data access / schema owner.
    Data,
    /// Workspace hosting several packages.
    MonoRepo,
    /// Nothing matched.
    #[default]
    #[serde(other)]
    Unknown,
}

impl RepoType {
    /// Returns the serialized tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Library => "library",
            Self::Infra => "infra",
            Self::Frontend => "frontend",
            Self::Worker => "worker",
            Self::Data => "data",
            Self::MonoRepo => "mono-repo",
            Self::Unknown => "unknown",
        }
    }
}

/// Kind of an internal interaction between repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// HTTP call to an internal endpoint.
    Http,
    /// Message queue or event stream.
    Queue,
    /// Package dependency.
    Pkg,
    /// Shared database.
    Db,
    /// Generated SDK or client library.
    Sdk,
}

impl InteractionKind {
    /// Returns the serialized tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Queue => "queue",
            Self::Pkg => "pkg",
            Self::Db => "db",
            Self::Sdk => "sdk",
        }
    }
}

/// How a route was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStyle {
    /// `app.get('/x', ...)` style call.
    ExpressLike,
    /// `@Controller` / `@Get` decorators.
    Nestjs,
    /// File-system routing.
    Next,
    /// Anything else.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Identity and classification of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepoMetadata {
    /// Package name, or the directory name when there is no manifest.
    pub name: String,
    /// Absolute path of the repository root.
    pub root_path: String,
    /// Path relative to the scan root (`.` for the root itself).
    pub relative_path: String,
    /// Languages ordered by file count, most frequent first.
    pub languages: Vec<String>,
    /// Detected framework tags, sorted.
    pub frameworks: Vec<String>,
    /// Package manager tag (`pnpm`, `yarn`, `npm`, `bun` or `unknown`).
    pub package_manager: String,
    /// Classified repository type.
    pub repo_type: RepoType,
    /// `@`-prefixed owners from CODEOWNERS, sorted.
    pub owner_team: Vec<String>,
}

/// Composite record of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Inventory {
    /// RFC 3339 scan timestamp.
    pub generated_at: String,
    /// Absolute scan root.
    pub scan_root: String,
    /// Identifier of the snapshot this inventory belongs to.
    pub snapshot_id: String,
    /// One entry per discovered repository, in discovery order.
    pub repos: Vec<RepoMetadata>,
}

/// The parts of a package manifest other extractors depend on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageSummary {
    /// Package name.
    pub name: String,
    /// Script name to command.
    pub scripts: BTreeMap<String, String>,
    /// Runtime dependency names, sorted.
    pub dependencies: Vec<String>,
    /// Development dependency names, sorted.
    pub dev_dependencies: Vec<String>,
    /// Workspace globs.
    pub workspaces: Vec<String>,
}

impl PackageSummary {
    /// Runtime and development dependencies, in that order.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &String> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }
}

/// One detected HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteDescriptor {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Normalized path, always starting with `/`.
    pub path: String,
    /// Repo-relative source file.
    pub file: String,
    /// Detection style.
    pub style: RouteStyle,
}

/// A message-queue or event consumer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageConsumer {
    /// Transport tag (`kafka`, `rabbitmq`, ...).
    pub transport: String,
    /// Topic or queue name.
    pub topic_or_queue: String,
    /// Repo-relative source file.
    pub file: String,
}

/// A scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CronJobDescriptor {
    /// Cron expression as written.
    pub schedule: String,
    /// Repo-relative source file.
    pub file: String,
}

/// A command-line entrypoint declared as a package script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliEntrypoint {
    /// Script name.
    pub name: String,
    /// Script command.
    pub command: String,
}

/// Everything a repository exposes to callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiSurface {
    /// Routes sorted by method, path, file.
    pub routes: Vec<RouteDescriptor>,
    /// Message consumers.
    pub message_consumers: Vec<MessageConsumer>,
    /// Cron jobs.
    pub cron_jobs: Vec<CronJobDescriptor>,
    /// CLI entrypoints.
    pub cli_entrypoints: Vec<CliEntrypoint>,
    /// Frontend page routes.
    pub frontend_pages: Vec<String>,
    /// Detected API client libraries.
    pub api_clients: Vec<String>,
    /// Detected authentication signals.
    pub auth_signals: Vec<String>,
}

/// One ranked vocabulary term.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainTerm {
    /// Normalized token.
    pub term: String,
    /// Sum of the weights of every occurrence.
    pub score: u32,
    /// Evidence tags that contributed, sorted.
    pub sources: Vec<String>,
}

/// Ranked domain vocabulary of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomainTerms {
    /// Highest-scoring terms, best first.
    pub top_terms: Vec<DomainTerm>,
}

/// A persisted data entity (table, model, document).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataEntity {
    /// Entity name.
    pub name: String,
    /// Repo-relative file declaring it.
    pub source: String,
}

/// A relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataRelationship {
    /// Owning entity.
    pub from: String,
    /// Referenced entity.
    pub to: String,
    /// Relation kind.
    pub relation: String,
    /// Repo-relative file declaring it.
    pub source: String,
}

/// Data model of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbModelSummary {
    /// Entities, deduplicated and sorted.
    pub entities: Vec<DataEntity>,
    /// Relationships, deduplicated and sorted.
    pub relationships: Vec<DataRelationship>,
}

/// One URL literal found in source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundCall {
    /// Host (with non-default port).
    pub host: String,
    /// `http` or `https`.
    pub protocol: String,
    /// Repo-relative source file.
    pub file: String,
}

/// Third-party dependencies of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependenciesExternal {
    /// External hosts referenced in source.
    pub outbound_hosts: Vec<String>,
    /// Cloud/vendor SDK packages.
    pub sdk_usages: Vec<String>,
    /// Database driver packages.
    pub databases: Vec<String>,
    /// Queue client packages.
    pub queues: Vec<String>,
    /// Third parties (currently the external hosts).
    pub third_parties: Vec<String>,
}

/// One piece of evidence that a repository talks to an internal target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalDependency {
    /// Package name, env var or host.
    pub target: String,
    /// Interaction kind.
    pub kind: InteractionKind,
    /// Where the evidence came from.
    pub evidence: String,
}

/// Same-organization dependencies of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependenciesInternal {
    /// Scoped package dependencies.
    pub internal_packages: Vec<String>,
    /// Endpoint env vars that look internal.
    pub internal_host_env_vars: Vec<String>,
    /// Hosts in URL literals classified as internal.
    pub internal_hosts: Vec<String>,
    /// Unified interaction list.
    pub interactions: Vec<InternalDependency>,
}

/// Environment variables referenced by source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvSummary {
    /// Every referenced variable, sorted.
    pub all: Vec<String>,
    /// Variables whose names look like endpoints.
    pub endpoint_like: Vec<String>,
}

/// A large source file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotFile {
    /// Repo-relative path.
    pub file: String,
    /// Line count.
    pub lines: usize,
}

/// Code-quality signals of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualitySignals {
    /// At least one test file exists.
    pub tests_present: bool,
    /// Number of test files.
    pub test_file_count: usize,
    /// A CI pipeline definition exists.
    pub ci_configured: bool,
    /// A lint script or config exists.
    pub lint_configured: bool,
    /// A format script or config exists.
    pub format_configured: bool,
    /// `tsconfig.json` enables strict mode.
    pub typescript_strict: bool,
    /// Largest source files by line count.
    pub largest_files: Vec<HotspotFile>,
    /// Deepest directories.
    pub deepest_folders: Vec<String>,
    /// Import cycles as `a -> b -> a` chains.
    pub cycles: Vec<String>,
    /// `log:<file>` entries.
    pub logging_signals: Vec<String>,
    /// `metrics:<file>` entries.
    pub metrics_signals: Vec<String>,
    /// `tracing:<file>` entries.
    pub tracing_signals: Vec<String>,
}

/// All facts extracted for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepoRawData {
    /// Identity and classification.
    pub metadata: RepoMetadata,
    /// Manifest summary.
    pub package_summary: PackageSummary,
    /// Routes (same list as `api_surface.routes`).
    pub routes: Vec<RouteDescriptor>,
    /// API surface.
    pub api_surface: ApiSurface,
    /// Ranked vocabulary.
    pub domain_terms: DomainTerms,
    /// Data model.
    pub db_models: DbModelSummary,
    /// URL literals.
    pub outbound_calls: Vec<OutboundCall>,
    /// Third-party dependencies.
    pub dependencies_external: DependenciesExternal,
    /// Internal dependencies.
    pub dependencies_internal: DependenciesInternal,
    /// Environment variables.
    pub env_vars: EnvSummary,
    /// Quality signals.
    pub quality_signals: QualitySignals,
}

/// Result of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    /// The composite inventory.
    pub inventory: Inventory,
    /// Per-repository facts, in inventory order.
    pub repos: Vec<RepoRawData>,
}

/// Repository names added, removed or changed for one fact domain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection {
    /// Present in head only.
    pub added: Vec<String>,
    /// Present in base only.
    pub removed: Vec<String>,
    /// Present in both with different canonical content.
    pub changed: Vec<String>,
}

impl DiffSection {
    /// Returns `true` when nothing was added, removed or changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Comparison of two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffReport {
    /// RFC 3339 generation timestamp.
    pub generated_at: String,
    /// Base snapshot identifier.
    pub base_snapshot: String,
    /// Head snapshot identifier.
    pub head_snapshot: String,
    /// API surface changes.
    pub api_surface: DiffSection,
    /// External dependency changes.
    pub dependencies: DiffSection,
    /// Domain term changes.
    pub domain_terms: DiffSection,
    /// Quality signal changes.
    pub quality_signals: DiffSection,
}
