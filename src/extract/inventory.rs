//! Package manifest summary and repository metadata.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::context::ServiceContext;
use crate::extract::text::unique_sorted;
use crate::model::{PackageSummary, RepoMetadata, RepoType};
use crate::survey::{extension, RepoTree};

const LANGUAGES: &[(&str, &str)] = &[
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("cjs", "JavaScript"),
    ("py", "Python"),
    ("go", "Go"),
    ("java", "Java"),
    ("rb", "Ruby"),
    ("rs", "Rust"),
    ("tf", "Terraform"),
    ("sql", "SQL"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("json", "JSON"),
    ("md", "Markdown"),
];

const FRAMEWORKS: &[(&str, &str)] = &[
    ("next", "next"),
    ("react", "react"),
    ("vite", "vite"),
    ("express", "express"),
    ("fastify", "fastify"),
    ("@nestjs/core", "nest"),
    ("koa", "koa"),
    ("hono", "hono"),
    ("prisma", "prisma"),
    ("typeorm", "typeorm"),
    ("sequelize", "sequelize"),
    ("mongoose", "mongoose"),
    ("kafkajs", "kafka"),
    ("@aws-sdk/client-sqs", "sqs"),
    ("amqplib", "rabbitmq"),
    ("bullmq", "bullmq"),
];

const LOCKFILES: &[(&str, &str)] = &[
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
    ("bun.lockb", "bun"),
];

const CODEOWNERS_LOCATIONS: &[&str] = &["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

const INFRA_FOLDERS: &[&str] = &["terraform", "infra", "helm", "k8s"];

fn dir_name(root: &Path) -> String {
    root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|map| unique_sorted(map.keys().cloned()))
        .unwrap_or_default()
}

/// Reads `package.json` into a [`PackageSummary`].
///
/// A missing or unparsable manifest yields a summary carrying only the
/// directory name.
#[must_use]
pub fn package_summary(ctx: &ServiceContext, tree: &RepoTree) -> PackageSummary {
    let fallback = PackageSummary { name: dir_name(&tree.root), ..PackageSummary::default() };
    let path = tree.abs("package.json");
    let raw = match ctx.fs.read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            if ctx.fs.exists(&path) {
                debug!(path = %path.display(), error = %e, "unreadable package manifest");
            }
            return fallback;
        }
    };
    let manifest: Value = match serde_json::from_str(&raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            debug!(path = %path.display(), "unparsable package manifest");
            return fallback;
        }
    };

    let name = manifest
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map_or(fallback.name, str::to_string);

    let scripts: BTreeMap<String, String> = manifest
        .get("scripts")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    v.as_str().filter(|cmd| !cmd.is_empty()).map(|cmd| (k.clone(), cmd.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let workspaces = match manifest.get("workspaces") {
        Some(Value::Array(_)) => string_array(manifest.get("workspaces")),
        Some(Value::Object(obj)) => string_array(obj.get("packages")),
        _ => Vec::new(),
    };

    PackageSummary {
        name,
        scripts,
        dependencies: object_keys(manifest.get("dependencies")),
        dev_dependencies: object_keys(manifest.get("devDependencies")),
        workspaces,
    }
}

/// Languages ordered by file count descending, ties broken by name.
#[must_use]
pub fn detect_languages(tree: &RepoTree) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for file in &tree.files {
        let Some(ext) = extension(file) else {
            continue;
        };
        if let Some((_, lang)) = LANGUAGES.iter().find(|(e, _)| *e == ext) {
            *counts.entry(*lang).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(lang, _)| lang.to_string()).collect()
}

fn detect_frameworks(ctx: &ServiceContext, tree: &RepoTree, pkg: &PackageSummary) -> Vec<String> {
    let mut tags: Vec<String> = pkg
        .all_dependencies()
        .filter_map(|dep| FRAMEWORKS.iter().find(|(name, _)| name == dep).map(|(_, tag)| *tag))
        .map(str::to_string)
        .collect();
    if !ctx.fs.read_or_empty(&tree.abs("Dockerfile")).trim().is_empty() {
        tags.push("docker".to_string());
    }
    unique_sorted(tags)
}

fn detect_package_manager(ctx: &ServiceContext, tree: &RepoTree) -> String {
    LOCKFILES
        .iter()
        .find(|(file, _)| ctx.fs.exists(&tree.abs(file)))
        .map_or("unknown", |(_, tag)| *tag)
        .to_string()
}

fn detect_owner_team(ctx: &ServiceContext, tree: &RepoTree) -> Vec<String> {
    let Some(path) =
        CODEOWNERS_LOCATIONS.iter().map(|rel| tree.abs(rel)).find(|p| ctx.fs.exists(p))
    else {
        return Vec::new();
    };
    let contents = ctx.fs.read_or_empty(&path);
    unique_sorted(
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .flat_map(|line| line.split_whitespace().skip(1))
            .filter(|token| token.starts_with('@')),
    )
}

/// Classifies a repository, first matching rule wins.
#[must_use]
pub fn classify_repo(pkg: &PackageSummary, top_level_folders: &[String]) -> RepoType {
    let has_dep = |names: &[&str]| pkg.all_dependencies().any(|d| names.contains(&d.as_str()));

    if !pkg.workspaces.is_empty() {
        return RepoType::MonoRepo;
    }
    if top_level_folders.iter().any(|f| INFRA_FOLDERS.contains(&f.as_str())) {
        return RepoType::Infra;
    }
    if has_dep(&["next", "react", "vite"]) {
        return RepoType::Frontend;
    }
    if has_dep(&["bullmq"]) || pkg.scripts.contains_key("worker") {
        return RepoType::Worker;
    }
    if has_dep(&["express", "fastify", "@nestjs/core"]) || pkg.scripts.contains_key("start") {
        return RepoType::Service;
    }
    if has_dep(&["prisma", "@prisma/client", "typeorm", "sequelize", "mongoose"]) {
        return RepoType::Data;
    }
    if pkg.scripts.contains_key("build") || !pkg.dependencies.is_empty() {
        return RepoType::Library;
    }
    RepoType::Unknown
}

/// `/`-joined path of `root` below `scan_root`, `.` for the scan root itself.
#[must_use]
pub fn relative_path(root: &Path, scan_root: &Path) -> String {
    match root.strip_prefix(scan_root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => root.display().to_string(),
    }
}

/// Builds the [`RepoMetadata`] for one repository.
#[must_use]
pub fn repo_metadata(
    ctx: &ServiceContext,
    tree: &RepoTree,
    scan_root: &Path,
    pkg: &PackageSummary,
) -> RepoMetadata {
    RepoMetadata {
        name: pkg.name.clone(),
        root_path: tree.root.display().to_string(),
        relative_path: relative_path(&tree.root, scan_root),
        languages: detect_languages(tree),
        frameworks: detect_frameworks(ctx, tree, pkg),
        package_manager: detect_package_manager(ctx, tree),
        repo_type: classify_repo(pkg, &tree.top_level_folders()),
        owner_team: detect_owner_team(ctx, tree),
    }
}
