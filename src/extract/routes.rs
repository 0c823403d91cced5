//! API surface: HTTP routes, message consumers, cron jobs, CLI entrypoints,
//! frontend pages, API clients and auth signals.
//!
//! Each detector is a declarative (pattern, fact) rule applied to every
//! source file; adding a detector means adding a table row.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ServiceContext;
use crate::extract::text::{dedupe_by_key, unique_sorted};
use crate::model::{
    ApiSurface, CliEntrypoint, CronJobDescriptor, MessageConsumer, PackageSummary,
    RouteDescriptor, RouteStyle,
};
use crate::survey::{has_extension, RepoTree};

static EXPRESS_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:app|router|fastify)\.(get|post|put|patch|delete|options|head|all)\(\s*['"`]([^'"`]+)['"`]"#,
    )
    .expect("valid express route regex")
});

static NEST_CONTROLLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@Controller\(\s*(?:['"`]([^'"`]*)['"`])?\s*\)"#)
        .expect("valid nest controller regex")
});

static NEST_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(Get|Post|Put|Patch|Delete|Options|Head|All)\(\s*(?:['"`]([^'"`]*)['"`])?\s*\)"#)
        .expect("valid nest method regex")
});

static REPEATED_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/+").expect("valid slash regex"));

static CONSUMER_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("kafka", r#"(?i)(?:subscribe|topic)\s*[:(]\s*['"`]([^'"`]+)['"`]"#),
        ("nestjs-message", r#"(?i)@MessagePattern\(\s*['"`]([^'"`]+)['"`]"#),
        ("rabbitmq", r#"(?i)\.consume\(\s*['"`]([^'"`]+)['"`]"#),
        ("sqs", r#"(?i)queueUrl\s*[:=]\s*['"`]([^'"`]+)['"`]"#),
    ]
    .into_iter()
    .map(|(transport, pattern)| (transport, Regex::new(pattern).expect("valid consumer regex")))
    .collect()
});

static CRON_JOB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:cron\.schedule|new\s+CronJob|@Cron)\(\s*['"`]([^'"`]+)['"`]"#)
        .expect("valid cron regex")
});

static API_CLIENT_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("fetch", r"\bfetch\s*\("),
        ("axios", r"\baxios\."),
        ("apollo-client", r"@apollo/client"),
        ("swr", r"(?i)\bswr\b"),
        ("react-query", r"@tanstack/react-query"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid api client regex")))
    .collect()
});

/// Code substrings mapped to auth signal tags.
const AUTH_CODE_SIGNALS: &[(&str, &str)] =
    &[("next-auth", "next-auth"), ("passport", "passport"), ("jwt", "jwt"), ("Auth0", "auth0")];

const AUTH_DEPENDENCY_TOKENS: &[&str] = &["auth", "passport", "jwt"];

const CLI_SCRIPT_TOKENS: &[&str] = &["cli", "migrate", "seed"];

const PAGE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Trims a raw route path and forces a leading `/`.
#[must_use]
pub fn normalize_route_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn express_routes(file: &str, code: &str) -> Vec<RouteDescriptor> {
    EXPRESS_ROUTE
        .captures_iter(code)
        .map(|caps| RouteDescriptor {
            method: caps[1].to_uppercase(),
            path: normalize_route_path(&caps[2]),
            file: file.to_string(),
            style: RouteStyle::ExpressLike,
        })
        .collect()
}

fn nest_routes(file: &str, code: &str) -> Vec<RouteDescriptor> {
    let prefix = NEST_CONTROLLER
        .captures(code)
        .map_or_else(|| "/".to_string(), |caps| {
            normalize_route_path(caps.get(1).map_or("", |m| m.as_str()))
        });

    NEST_METHOD
        .captures_iter(code)
        .map(|caps| {
            let suffix = caps.get(2).map_or("", |m| m.as_str().trim());
            let joined = REPEATED_SLASH.replace_all(&format!("{prefix}/{suffix}"), "/").into_owned();
            let path = match joined.strip_suffix('/') {
                Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                _ => joined,
            };
            RouteDescriptor {
                method: caps[1].to_uppercase(),
                path: normalize_route_path(&path),
                file: file.to_string(),
                style: RouteStyle::Nestjs,
            }
        })
        .collect()
}

/// Deduplicates routes by (method, path, file) and sorts them in that order.
#[must_use]
pub fn dedupe_routes(routes: Vec<RouteDescriptor>) -> Vec<RouteDescriptor> {
    let mut routes = dedupe_by_key(routes, |r| vec![r.method.as_str(), r.path.as_str(), r.file.as_str()]);
    routes.sort_by(|a, b| {
        a.method.cmp(&b.method).then_with(|| a.path.cmp(&b.path)).then_with(|| a.file.cmp(&b.file))
    });
    routes
}

fn message_consumers(file: &str, code: &str) -> Vec<MessageConsumer> {
    CONSUMER_RULES
        .iter()
        .flat_map(|(transport, regex)| {
            regex.captures_iter(code).map(move |caps| MessageConsumer {
                transport: (*transport).to_string(),
                topic_or_queue: caps[1].to_string(),
                file: file.to_string(),
            })
        })
        .collect()
}

fn cron_jobs(file: &str, code: &str) -> Vec<CronJobDescriptor> {
    CRON_JOB
        .captures_iter(code)
        .map(|caps| CronJobDescriptor { schedule: caps[1].to_string(), file: file.to_string() })
        .collect()
}

fn cli_entrypoints(pkg: &PackageSummary) -> Vec<CliEntrypoint> {
    pkg.scripts
        .iter()
        .filter(|(name, _)| CLI_SCRIPT_TOKENS.iter().any(|t| name.contains(t)))
        .map(|(name, command)| CliEntrypoint { name: name.clone(), command: command.clone() })
        .collect()
}

/// Derives a frontend route from a file under a `pages` or `app` directory.
///
/// Returns `None` for files outside those conventions.
#[must_use]
pub fn frontend_page(file: &str) -> Option<String> {
    if !has_extension(file, PAGE_EXTENSIONS) {
        return None;
    }
    let segments: Vec<&str> = file.split('/').collect();
    let (dirs, name) = segments.split_at(segments.len() - 1);
    let stem = name[0].rsplit_once('.').map_or(name[0], |(stem, _)| stem);

    let mut route: Vec<&str> = if let Some(pos) = dirs.iter().position(|s| *s == "pages") {
        let mut parts = dirs[pos + 1..].to_vec();
        parts.push(stem);
        parts
    } else if let Some(pos) = dirs.iter().position(|s| *s == "app") {
        if stem != "page" && stem != "route" {
            return None;
        }
        dirs[pos + 1..].to_vec()
    } else {
        return None;
    };

    route.retain(|s| !(s.starts_with('(') && s.ends_with(')')));
    if route.last() == Some(&"index") {
        route.pop();
    }
    let path = route
        .iter()
        .map(|s| match s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(param) => format!(":{param}"),
            None => (*s).to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");
    Some(normalize_route_path(&path))
}

fn api_clients(contents: &[(String, String)]) -> Vec<String> {
    unique_sorted(
        API_CLIENT_RULES
            .iter()
            .filter(|(_, regex)| contents.iter().any(|(_, code)| regex.is_match(code)))
            .map(|(name, _)| *name),
    )
}

fn auth_signals(contents: &[(String, String)], pkg: &PackageSummary) -> Vec<String> {
    let from_deps = pkg
        .dependencies
        .iter()
        .filter(|dep| AUTH_DEPENDENCY_TOKENS.iter().any(|t| dep.contains(t)))
        .cloned();
    let from_code = AUTH_CODE_SIGNALS
        .iter()
        .filter(|(needle, _)| contents.iter().any(|(_, code)| code.contains(needle)))
        .map(|(_, tag)| (*tag).to_string());
    unique_sorted(from_deps.chain(from_code))
}

/// Extracts the API surface of a repository from its source files.
///
/// Unreadable files contribute nothing.
#[must_use]
pub fn extract_api_surface(
    ctx: &ServiceContext,
    tree: &RepoTree,
    source_files: &[String],
    pkg: &PackageSummary,
) -> ApiSurface {
    let contents: Vec<(String, String)> = source_files
        .iter()
        .map(|file| (file.clone(), ctx.fs.read_or_empty(&tree.abs(file))))
        .collect();

    let mut routes = Vec::new();
    let mut consumers = Vec::new();
    let mut jobs = Vec::new();
    for (file, code) in &contents {
        routes.extend(express_routes(file, code));
        routes.extend(nest_routes(file, code));
        consumers.extend(message_consumers(file, code));
        jobs.extend(cron_jobs(file, code));
    }

    ApiSurface {
        routes: dedupe_routes(routes),
        message_consumers: dedupe_by_key(consumers, |c| {
            vec![c.transport.as_str(), c.topic_or_queue.as_str(), c.file.as_str()]
        }),
        cron_jobs: dedupe_by_key(jobs, |j| vec![j.schedule.as_str(), j.file.as_str()]),
        cli_entrypoints: cli_entrypoints(pkg),
        frontend_pages: unique_sorted(source_files.iter().filter_map(|f| frontend_page(f))),
        api_clients: api_clients(&contents),
        auth_signals: auth_signals(&contents, pkg),
    }
}
