//! Outbound hosts, third-party packages and internal interactions.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::IntelConfig;
use crate::context::ServiceContext;
use crate::extract::text::unique_sorted;
use crate::model::{
    DependenciesExternal, DependenciesInternal, EnvSummary, InteractionKind, InternalDependency,
    OutboundCall, PackageSummary,
};
use crate::survey::RepoTree;

static URL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s'"`]+"#).expect("valid url literal regex"));

const SDK_PREFIXES: &[&str] =
    &["@aws-sdk/", "aws-sdk", "@google-cloud/", "stripe", "twilio", "firebase-admin"];
const DATABASE_KEYWORDS: &[&str] =
    &["postgres", "pg", "mysql", "mariadb", "mongodb", "mongoose", "redis", "dynamodb", "prisma"];
const QUEUE_KEYWORDS: &[&str] = &["kafka", "bull", "amq", "rabbit", "sqs", "sns"];
const INTERNAL_ENV_TOKENS: &[&str] = &["internal", "svc"];

/// Everything the dependency extractor produces for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyFacts {
    /// URL literals that resolved to a host.
    pub outbound_calls: Vec<OutboundCall>,
    /// Third-party facts.
    pub external: DependenciesExternal,
    /// Same-organization facts.
    pub internal: DependenciesInternal,
}

/// Resolves a URL literal to `host[:port]`, or `None` if it does not parse.
#[must_use]
pub fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn outbound_calls(file: &str, code: &str) -> Vec<OutboundCall> {
    URL_LITERAL
        .find_iter(code)
        .filter_map(|m| {
            let raw = m.as_str();
            let host = host_of(raw)?;
            let protocol = if raw.starts_with("https://") { "https" } else { "http" };
            Some(OutboundCall { host, protocol: protocol.to_string(), file: file.to_string() })
        })
        .collect()
}

fn matching(deps: &[&String], pred: impl Fn(&str) -> bool) -> Vec<String> {
    unique_sorted(deps.iter().filter(|d| pred(d.as_str())).map(|d| (*d).clone()))
}

/// Classifies outbound hosts and package dependencies.
///
/// `env` supplies the endpoint-like variables; those naming an internal
/// service become `http` interactions.
#[must_use]
pub fn extract_dependencies(
    ctx: &ServiceContext,
    tree: &RepoTree,
    source_files: &[String],
    pkg: &PackageSummary,
    env: &EnvSummary,
    config: &IntelConfig,
) -> DependencyFacts {
    let calls: Vec<OutboundCall> = source_files
        .iter()
        .flat_map(|file| outbound_calls(file, &ctx.fs.read_or_empty(&tree.abs(file))))
        .collect();

    let hosts = unique_sorted(calls.iter().map(|c| c.host.clone()));
    let (internal_hosts, external_hosts): (Vec<String>, Vec<String>) =
        hosts.into_iter().partition(|h| config.is_internal_host(h));

    let deps: Vec<&String> = pkg.all_dependencies().collect();
    let external = DependenciesExternal {
        outbound_hosts: external_hosts.clone(),
        sdk_usages: matching(&deps, |d| SDK_PREFIXES.iter().any(|p| d.starts_with(p))),
        databases: matching(&deps, |d| DATABASE_KEYWORDS.iter().any(|k| d.contains(k))),
        queues: matching(&deps, |d| QUEUE_KEYWORDS.iter().any(|k| d.contains(k))),
        third_parties: external_hosts,
    };

    let internal_packages = matching(&deps, |d| d.starts_with('@'));
    let internal_host_env_vars: Vec<String> = env
        .endpoint_like
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            INTERNAL_ENV_TOKENS.iter().any(|t| lower.contains(t))
        })
        .cloned()
        .collect();

    let interaction = |target: &String, kind, evidence: &str| InternalDependency {
        target: target.clone(),
        kind,
        evidence: evidence.to_string(),
    };
    let interactions = internal_packages
        .iter()
        .map(|t| interaction(t, InteractionKind::Pkg, "package dependency"))
        .chain(
            internal_host_env_vars
                .iter()
                .map(|t| interaction(t, InteractionKind::Http, "internal endpoint env var")),
        )
        .chain(
            internal_hosts
                .iter()
                .map(|t| interaction(t, InteractionKind::Http, "internal host literal")),
        )
        .collect();

    DependencyFacts {
        outbound_calls: calls,
        external,
        internal: DependenciesInternal {
            internal_packages,
            internal_host_env_vars,
            internal_hosts,
            interactions,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::testing::{test_context, MemFs};

    fn run(code: &str, pkg: &PackageSummary, env: &EnvSummary) -> DependencyFacts {
        let ctx = test_context(MemFs::with_files([("/r/src/client.ts", code)]));
        let files = vec!["src/client.ts".to_string()];
        let tree = RepoTree::from_files(Path::new("/r"), &files);
        extract_dependencies(&ctx, &tree, &files, pkg, env, &IntelConfig::default())
    }

    #[test]
    fn hosts_are_split_into_internal_and_external() {
        let code = "fetch('https://api.stripe.com/v1/charges');\n\
                    fetch(`http://orders.svc.cluster.local:8080/orders`);\n\
                    const bad = 'http://';";
        let facts = run(code, &PackageSummary::default(), &EnvSummary::default());
        let hosts: Vec<(&str, &str)> =
            facts.outbound_calls.iter().map(|c| (c.host.as_str(), c.protocol.as_str())).collect();
        assert_eq!(
            hosts,
            vec![("api.stripe.com", "https"), ("orders.svc.cluster.local:8080", "http")]
        );
        assert_eq!(facts.external.outbound_hosts, vec!["api.stripe.com"]);
        assert_eq!(facts.external.third_parties, facts.external.outbound_hosts);
        assert_eq!(facts.internal.internal_hosts, vec!["orders.svc.cluster.local:8080"]);
        assert_eq!(facts.internal.interactions[0].evidence, "internal host literal");
    }

    #[test]
    fn packages_are_classified_by_keyword() {
        let pkg = PackageSummary {
            dependencies: vec![
                "@acme/billing-client".into(),
                "@aws-sdk/client-s3".into(),
                "kafkajs".into(),
                "pg".into(),
            ],
            dev_dependencies: vec!["@types/node".into()],
            ..PackageSummary::default()
        };
        let facts = run("", &pkg, &EnvSummary::default());
        assert_eq!(facts.external.sdk_usages, vec!["@aws-sdk/client-s3"]);
        assert_eq!(facts.external.databases, vec!["pg"]);
        assert_eq!(facts.external.queues, vec!["kafkajs"]);
        assert_eq!(
            facts.internal.internal_packages,
            vec!["@acme/billing-client", "@aws-sdk/client-s3", "@types/node"]
        );
        assert!(facts
            .internal
            .interactions
            .iter()
            .all(|i| i.kind == InteractionKind::Pkg && i.evidence == "package dependency"));
    }

    #[test]
    fn internal_endpoint_env_vars_become_http_interactions() {
        let env = EnvSummary {
            all: vec![],
            endpoint_like: vec!["BILLING_SVC_URL".into(), "PUBLIC_BASE_URL".into()],
        };
        let facts = run("", &PackageSummary::default(), &env);
        assert_eq!(facts.internal.internal_host_env_vars, vec!["BILLING_SVC_URL"]);
        assert_eq!(
            facts.internal.interactions,
            vec![InternalDependency {
                target: "BILLING_SVC_URL".into(),
                kind: InteractionKind::Http,
                evidence: "internal endpoint env var".into(),
            }]
        );
    }

    #[test]
    fn unparsable_urls_are_dropped() {
        assert_eq!(host_of("http://"), None);
        assert_eq!(host_of("https://example.com:443/x").as_deref(), Some("example.com"));
    }
}
