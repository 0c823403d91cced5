//! Document generation from the current view.
//!
//! Each repository listed in the current inventory gets seven markdown
//! documents under `repos/<name>/docs/`. Fact files are loaded individually;
//! one that is missing or malformed only blanks the sections built from it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::model::{
    ApiSurface, DbModelSummary, DependenciesExternal, DependenciesInternal, DomainTerms,
    EnvSummary, PackageSummary, QualitySignals, RepoMetadata,
};
use crate::store::{FactDomain, SnapshotStore, View};

/// Line rendered in place of a section whose fact file is absent.
pub const NO_DATA: &str = "- No data (run scan)";

const NONE_DETECTED: &str = "- None detected";

/// Scripts surfaced as run commands, in display order.
const RUN_SCRIPTS: [&str; 5] = ["dev", "start", "build", "test", "lint"];

/// Renders a markdown table. Empty cells become `-` and pipes are escaped.
#[must_use]
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cell = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.replace('|', "\\|")
        }
    };
    let mut lines = vec![
        format!("| {} |", headers.join(" | ")),
        format!("| {} |", vec!["---"; headers.len()].join(" | ")),
    ];
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| cell(v)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

fn bullet_list(values: &[String]) -> String {
    if values.is_empty() {
        return NONE_DETECTED.to_string();
    }
    values.iter().map(|v| format!("- {v}")).collect::<Vec<_>>().join("\n")
}

/// Renders a fact with `render`, or the placeholder when it is absent.
fn or_no_data<T>(fact: Option<&T>, render: impl FnOnce(&T) -> String) -> String {
    fact.map_or_else(|| NO_DATA.to_string(), render)
}

/// Everything the documents of one repository are built from.
#[derive(Debug, Clone, Default)]
pub struct RepoFacts {
    /// Inventory entry.
    pub metadata: RepoMetadata,
    /// `package.summary.json`.
    pub package: Option<PackageSummary>,
    /// `api_surface.json`.
    pub api: Option<ApiSurface>,
    /// `domain_terms.json`.
    pub terms: Option<DomainTerms>,
    /// `db_models.json`.
    pub db: Option<DbModelSummary>,
    /// `dependencies_external.json`.
    pub external: Option<DependenciesExternal>,
    /// `dependencies_internal.json`.
    pub internal: Option<DependenciesInternal>,
    /// `envvars.json`.
    pub env: Option<EnvSummary>,
    /// `quality_signals.json`.
    pub quality: Option<QualitySignals>,
}

impl RepoFacts {
    /// Loads every fact file of `metadata.name` from the current view.
    #[must_use]
    pub fn load(store: &SnapshotStore<'_>, metadata: RepoMetadata) -> Self {
        let name = metadata.name.clone();
        let view = View::Current;
        let facts = Self {
            package: store.load_fact(view, &name, FactDomain::PackageSummary),
            api: store.load_fact(view, &name, FactDomain::ApiSurface),
            terms: store.load_fact(view, &name, FactDomain::DomainTerms),
            db: store.load_fact(view, &name, FactDomain::DbModels),
            external: store.load_fact(view, &name, FactDomain::DependenciesExternal),
            internal: store.load_fact(view, &name, FactDomain::DependenciesInternal),
            env: store.load_fact(view, &name, FactDomain::EnvVars),
            quality: store.load_fact(view, &name, FactDomain::QualitySignals),
            metadata,
        };
        debug!(repo = %name, "loaded facts for summary");
        facts
    }
}

fn top_terms(terms: &DomainTerms, limit: usize) -> Vec<&str> {
    terms.top_terms.iter().take(limit).map(|t| t.term.as_str()).collect()
}

fn key_flows(
    api: &ApiSurface,
    db: Option<&DbModelSummary>,
    external: Option<&DependenciesExternal>,
) -> Vec<String> {
    let entity = db.and_then(|d| d.entities.first()).map_or("data model", |e| e.name.as_str());
    let downstream = external
        .and_then(|e| e.outbound_hosts.first())
        .map_or("downstream side effects", String::as_str);
    let mut flows: Vec<String> = api
        .routes
        .iter()
        .take(3)
        .map(|r| format!("{} {} -> application service -> {entity} persistence -> response", r.method, r.path))
        .collect();
    flows.extend(api.message_consumers.iter().take(2).map(|c| {
        format!("Consume {}:{} -> domain handler -> {downstream}", c.transport, c.topic_or_queue)
    }));
    if flows.is_empty() {
        flows.push("Startup task -> core logic execution -> internal package interactions".to_string());
    }
    flows
}

fn data_model(db: &DbModelSummary) -> String {
    let entities: Vec<String> = db.entities.iter().map(|e| e.name.clone()).collect();
    let relations: Vec<String> = db
        .relationships
        .iter()
        .map(|r| format!("{} -> {} ({})", r.from, r.to, r.relation))
        .collect();
    let entities = if entities.is_empty() { "- No entities detected".to_string() } else { bullet_list(&entities) };
    let relations = if relations.is_empty() {
        "- No explicit relationships detected".to_string()
    } else {
        bullet_list(&relations)
    };
    format!("### Entities\n{entities}\n\n### Relationships\n{relations}")
}

fn run_commands(package: &PackageSummary) -> Vec<String> {
    let commands: Vec<String> = RUN_SCRIPTS
        .iter()
        .filter_map(|name| package.scripts.get(*name).map(|cmd| format!("{name}: {cmd}")))
        .collect();
    if commands.is_empty() {
        return vec!["No standard scripts detected in package.json".to_string()];
    }
    commands
}

fn deploy_notes(metadata: &RepoMetadata, quality: &QualitySignals) -> Vec<String> {
    let mut notes = Vec::new();
    if metadata.frameworks.iter().any(|f| f == "docker") {
        notes.push("Dockerfile detected (containerized deployment likely).".to_string());
    }
    if quality.ci_configured {
        notes.push("CI configuration detected (.github/workflows or gitlab-ci).".to_string());
    }
    if notes.is_empty() {
        notes.push("No explicit deployment pipeline detected from scanned files.".to_string());
    }
    notes
}

fn operational_notes(quality: &QualitySignals) -> Vec<String> {
    let mut notes: Vec<String> = [
        ("Logging", &quality.logging_signals),
        ("Metrics", &quality.metrics_signals),
        ("Tracing", &quality.tracing_signals),
    ]
    .into_iter()
    .filter(|(_, signals)| !signals.is_empty())
    .map(|(label, signals)| format!("{label} signals: {}", signals.len()))
    .collect();
    if notes.is_empty() {
        notes.push("No explicit logging/metrics/tracing signals were detected.".to_string());
    }
    notes
}

fn risk_notes(quality: &QualitySignals) -> Vec<String> {
    let mut risks = Vec::new();
    if !quality.tests_present {
        risks.push("Tests are missing; regression risk is high.".to_string());
    }
    if !quality.typescript_strict {
        risks.push("TypeScript strict mode is not enabled.".to_string());
    }
    if !quality.ci_configured {
        risks.push("CI configuration not detected.".to_string());
    }
    if !quality.cycles.is_empty() {
        risks.push(format!("Import cycles detected: {}.", quality.cycles.len()));
    }
    if risks.is_empty() {
        risks.push("No critical quality red flags detected from static signals.".to_string());
    }
    risks
}

/// Incrementally assembled markdown document.
struct Doc {
    out: String,
}

impl Doc {
    fn new(title: &str) -> Self {
        Self { out: format!("# {title}\n") }
    }

    fn section(mut self, heading: &str, body: &str) -> Self {
        self.out.push_str(&format!("\n## {heading}\n\n{}\n", body.trim_end()));
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

fn handover(f: &RepoFacts) -> String {
    let m = &f.metadata;
    let what_it_is = or_no_data(f.api.as_ref(), |api| {
        format!(
            "{} is a {} repository built primarily with {}. It exposes {} detected HTTP route(s) and {} message consumer(s), and it acts as an owned unit inside {}.",
            m.name,
            m.repo_type.as_str(),
            m.languages.first().map_or("unknown stack", String::as_str),
            api.routes.len(),
            api.message_consumers.len(),
            m.relative_path,
        )
    });
    let capability = or_no_data(f.terms.as_ref(), |terms| {
        let top = top_terms(terms, 6);
        let text = if top.is_empty() { "no strong domain terms detected yet".to_string() } else { top.join(", ") };
        format!(
            "{} owns business logic around {text}. The boundary is inferred from local APIs/entities and internal dependencies; cross-repo integrations are treated as consumed capabilities.",
            m.name
        )
    });
    let flows = or_no_data(f.api.as_ref(), |api| {
        bullet_list(&key_flows(api, f.db.as_ref(), f.external.as_ref()))
    });
    let external = or_no_data(f.external.as_ref(), |e| {
        let lines: Vec<String> = e
            .outbound_hosts
            .iter()
            .map(|h| format!("HTTP host: {h}"))
            .chain(e.databases.iter().map(|d| format!("Database: {d}")))
            .chain(e.queues.iter().map(|q| format!("Queue/Event: {q}")))
            .chain(e.sdk_usages.iter().map(|s| format!("SDK: {s}")))
            .collect();
        bullet_list(&lines)
    });
    let internal = or_no_data(f.internal.as_ref(), |i| {
        let lines: Vec<String> = i
            .interactions
            .iter()
            .map(|x| format!("{} -> {} ({})", x.kind.as_str(), x.target, x.evidence))
            .collect();
        bullet_list(&lines)
    });
    let run_locally = or_no_data(f.package.as_ref(), |p| {
        let mut lines = run_commands(p);
        if let Some(env) = &f.env {
            lines.extend(env.all.iter().map(|v| format!("ENV: {v}=<value>")));
        }
        bullet_list(&lines)
    });
    let deploys = or_no_data(f.quality.as_ref(), |q| bullet_list(&deploy_notes(m, q)));
    let operations = or_no_data(f.quality.as_ref(), |q| bullet_list(&operational_notes(q)));
    let risks = or_no_data(f.quality.as_ref(), |q| bullet_list(&risk_notes(q)));
    let first_script = f
        .package
        .as_ref()
        .and_then(|p| p.scripts.keys().next())
        .map_or("dev/start", String::as_str);
    let checklist = bullet_list(&[
        format!("Read README.md and docs/ first in {}.", m.name),
        "Inspect HANDOVER.md and ARCHITECTURE.md generated in this repo intel pack.".to_string(),
        format!("Run one entry command ({first_script}) and one verification command (test/lint)."),
        "Walk through three key flows in HANDOVER.md before touching business rules.".to_string(),
        "Review dependencies_internal.json to understand upstream/downstream service links.".to_string(),
    ]);

    Doc::new(&format!("{} Handover", m.name))
        .section("1. What it is", &what_it_is)
        .section("2. What business capability it owns", &capability)
        .section("3. Key flows", &flows)
        .section("4. Core data model", &or_no_data(f.db.as_ref(), data_model))
        .section("5. External interactions", &external)
        .section("6. Internal interactions", &internal)
        .section("7. How to run locally", &run_locally)
        .section("8. How it deploys", &deploys)
        .section("9. Operational view", &operations)
        .section("10. Risk notes", &risks)
        .section("11. Onboarding checklist", &checklist)
        .finish()
}

fn architecture(f: &RepoFacts) -> String {
    let m = &f.metadata;
    let domains = f.terms.as_ref().map(|t| top_terms(t, 5).join(", ")).unwrap_or_default();
    let count = |n: Option<usize>| n.map_or_else(|| "an unknown number of".to_string(), |n| n.to_string());
    let responsibility = format!(
        "{} owns {} responsibilities around {}. It exposes {} route(s), consumes {} message stream(s), and maintains {} detected data entity(ies).",
        m.name,
        m.repo_type.as_str(),
        if domains.is_empty() { "detected domains" } else { domains.as_str() },
        count(f.api.as_ref().map(|a| a.routes.len())),
        count(f.api.as_ref().map(|a| a.message_consumers.len())),
        count(f.db.as_ref().map(|d| d.entities.len())),
    );
    let flows = or_no_data(f.api.as_ref(), |api| {
        bullet_list(&key_flows(api, f.db.as_ref(), f.external.as_ref()))
    });
    let internal = or_no_data(f.internal.as_ref(), |i| {
        let lines: Vec<String> =
            i.interactions.iter().map(|x| format!("{} -> {}", x.kind.as_str(), x.target)).collect();
        bullet_list(&lines)
    });

    Doc::new(&format!("{} Architecture", m.name))
        .section("Responsibility", &responsibility)
        .section("Primary Flows", &flows)
        .section("Data Ownership", &or_no_data(f.db.as_ref(), data_model))
        .section(
            "External Integrations",
            &or_no_data(f.external.as_ref(), |e| bullet_list(&e.outbound_hosts)),
        )
        .section("Internal Integrations", &internal)
        .finish()
}

fn runbook(f: &RepoFacts) -> String {
    let m = &f.metadata;
    let setup: Vec<String> = std::iter::once(format!("Package manager: {}", m.package_manager))
        .chain(m.frameworks.iter().map(|fw| format!("Framework: {fw}")))
        .collect();
    let env = or_no_data(f.env.as_ref(), |e| {
        let lines: Vec<String> = e.all.iter().map(|v| format!("{v}=<safe-placeholder>")).collect();
        bullet_list(&lines)
    });

    Doc::new(&format!("{} Runbook", m.name))
        .section("Local Setup", &bullet_list(&setup))
        .section("Commands", &or_no_data(f.package.as_ref(), |p| bullet_list(&run_commands(p))))
        .section("Environment Variables", &env)
        .section(
            "Common Failure Patterns",
            &or_no_data(f.quality.as_ref(), |q| bullet_list(&risk_notes(q))),
        )
        .finish()
}

fn new_dev(f: &RepoFacts) -> String {
    let read_first: Vec<String> =
        ["README.md", "docs/", "HANDOVER.md", "ARCHITECTURE.md", "api_surface.md", "domain_glossary.md"]
            .map(str::to_string)
            .to_vec();
    let flows = or_no_data(f.api.as_ref(), |api| {
        let mut flows = key_flows(api, f.db.as_ref(), f.external.as_ref());
        flows.truncate(3);
        bullet_list(&flows)
    });
    let rules = or_no_data(f.api.as_ref(), |api| {
        let lines: Vec<String> = api
            .routes
            .iter()
            .take(8)
            .map(|r| format!("{} {} ({})", r.method, r.path, r.file))
            .collect();
        bullet_list(&lines)
    });
    let careful = [
        "Data model migrations and schema files",
        "Message consumer handlers",
        "Cross-service endpoint wiring",
    ]
    .map(str::to_string);

    Doc::new(&format!("{} New Dev Guide", f.metadata.name))
        .section("Read This First", &bullet_list(&read_first))
        .section("Three Key Flows", &flows)
        .section("Where Business Rules Live", &rules)
        .section("Do Not Touch Before Understanding", &bullet_list(&careful))
        .finish()
}

fn health(f: &RepoFacts) -> String {
    let q = f.quality.as_ref();
    let scorecard = or_no_data(q, |q| {
        bullet_list(&[
            format!("Tests present: {} ({} file(s))", q.tests_present, q.test_file_count),
            format!("CI configured: {}", q.ci_configured),
            format!("Lint configured: {}", q.lint_configured),
            format!("Format configured: {}", q.format_configured),
            format!("TypeScript strict: {}", q.typescript_strict),
            format!("Import cycles: {}", q.cycles.len()),
        ])
    });
    let hotspots = or_no_data(q, |q| {
        let lines: Vec<String> =
            q.largest_files.iter().map(|h| format!("{} ({} lines)", h.file, h.lines)).collect();
        bullet_list(&lines)
    });

    Doc::new(&format!("{} Health", f.metadata.name))
        .section("Scorecard", &scorecard)
        .section("Complexity Hotspots", &hotspots)
        .section("Deepest Folders", &or_no_data(q, |q| bullet_list(&q.deepest_folders)))
        .section("Cycles", &or_no_data(q, |q| bullet_list(&q.cycles)))
        .finish()
}

fn api_surface_doc(api: Option<&ApiSurface>) -> String {
    let render = |lines: fn(&ApiSurface) -> Vec<String>| or_no_data(api, |a| bullet_list(&lines(a)));
    Doc::new("API Surface")
        .section(
            "Routes",
            &render(|a| a.routes.iter().map(|r| format!("{} {} ({})", r.method, r.path, r.file)).collect()),
        )
        .section(
            "Message Consumers",
            &render(|a| {
                a.message_consumers
                    .iter()
                    .map(|c| format!("{}: {} ({})", c.transport, c.topic_or_queue, c.file))
                    .collect()
            }),
        )
        .section(
            "Cron Jobs",
            &render(|a| a.cron_jobs.iter().map(|j| format!("{} ({})", j.schedule, j.file)).collect()),
        )
        .section(
            "CLI Entrypoints",
            &render(|a| a.cli_entrypoints.iter().map(|c| format!("{}: {}", c.name, c.command)).collect()),
        )
        .section("Frontend Pages", &render(|a| a.frontend_pages.clone()))
        .section("API Clients", &render(|a| a.api_clients.clone()))
        .section("Auth Signals", &render(|a| a.auth_signals.clone()))
        .finish()
}

fn domain_glossary(terms: Option<&DomainTerms>) -> String {
    let body = or_no_data(terms, |t| {
        let lines: Vec<String> = t
            .top_terms
            .iter()
            .map(|term| format!("{} (score: {}; sources: {})", term.term, term.score, term.sources.join(", ")))
            .collect();
        bullet_list(&lines)
    });
    format!("# Domain Glossary\n\n{body}\n")
}

/// Renders every document of one repository as `(file name, contents)`.
#[must_use]
pub fn render_documents(facts: &RepoFacts) -> Vec<(&'static str, String)> {
    vec![
        ("HANDOVER.md", handover(facts)),
        ("ARCHITECTURE.md", architecture(facts)),
        ("RUNBOOK.md", runbook(facts)),
        ("NEW_DEV.md", new_dev(facts)),
        ("HEALTH.md", health(facts)),
        ("api_surface.md", api_surface_doc(facts.api.as_ref())),
        ("domain_glossary.md", domain_glossary(facts.terms.as_ref())),
    ]
}

/// Generates documents for every repository in the current inventory, or
/// only for `repo` when given. Returns the docs directories written.
///
/// # Errors
///
/// Returns [`IntelError::MissingInventory`] before any scan,
/// [`IntelError::RepoNotFound`] when `repo` matches nothing, and any write
/// failure.
pub fn summarize(
    ctx: &ServiceContext,
    root: &Path,
    repo: Option<&str>,
) -> Result<Vec<PathBuf>, IntelError> {
    let store = SnapshotStore::new(ctx, root);
    let inventory = store.load_inventory(View::Current)?;
    let filter = repo.filter(|name| !name.is_empty());
    let selected: Vec<RepoMetadata> = inventory
        .repos
        .into_iter()
        .filter(|m| filter.map_or(true, |name| m.name == name))
        .collect();
    if selected.is_empty() {
        return Err(IntelError::RepoNotFound { name: filter.unwrap_or_default().to_string() });
    }

    let mut written = Vec::with_capacity(selected.len());
    for metadata in selected {
        let facts = RepoFacts::load(&store, metadata);
        let dir = store.docs_dir(&facts.metadata.name);
        for (file, contents) in render_documents(&facts) {
            store.write_text(&dir.join(file), &contents)?;
        }
        written.push(dir);
    }
    info!(repos = written.len(), "documents generated");
    Ok(written)
}
