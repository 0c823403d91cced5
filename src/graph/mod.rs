//! Organization service map rendered as a Mermaid flowchart.
//!
//! Nodes are the repositories of the current inventory; edges come from each
//! repository's internal interactions whose target names another repository.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::model::{DependenciesInternal, Inventory};
use crate::store::{FactDomain, SnapshotStore, View};

/// File name of the rendered map under the state directory.
pub const SERVICE_MAP_FILE: &str = "org-service-map.mmd";

/// A directed, labelled edge between two repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEdge {
    /// Repository holding the interaction.
    pub from: String,
    /// Repository the interaction resolved to.
    pub to: String,
    /// Interaction kind.
    pub label: String,
}

/// Mermaid node identifier for a repository name.
#[must_use]
pub fn node_id(name: &str) -> String {
    let mut id = String::new();
    for part in name
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
    {
        if !id.is_empty() {
            id.push('_');
        }
        id.push_str(part);
    }
    if id.is_empty() {
        return "repo_unknown".to_string();
    }
    id
}

/// Resolves an interaction target to a known repository name.
///
/// Matches the target itself, or the target with a leading `@` and any
/// `/suffix` removed (`@orders/client` resolves to `orders`).
fn resolve_target<'a>(target: &str, known: &BTreeSet<&'a str>) -> Option<&'a str> {
    if let Some(name) = known.get(target) {
        return Some(*name);
    }
    let stripped = target.strip_prefix('@').unwrap_or(target);
    let stripped = stripped.split('/').next().unwrap_or(stripped);
    known.get(stripped).copied()
}

/// Builds the deduplicated edge list, in inventory then interaction order.
#[must_use]
pub fn build_edges(
    inventory: &Inventory,
    internal: &[(String, DependenciesInternal)],
) -> Vec<ServiceEdge> {
    let known: BTreeSet<&str> = inventory.repos.iter().map(|r| r.name.as_str()).collect();
    let mut seen = BTreeSet::new();
    let mut edges = Vec::new();
    for (from, deps) in internal {
        for interaction in &deps.interactions {
            let Some(to) = resolve_target(&interaction.target, &known) else {
                continue;
            };
            if to == from.as_str() {
                continue;
            }
            let label = interaction.kind.as_str();
            if seen.insert(format!("{from}|{to}|{label}")) {
                edges.push(ServiceEdge {
                    from: from.clone(),
                    to: to.to_string(),
                    label: label.to_string(),
                });
            }
        }
    }
    edges
}

/// Renders nodes and edges as a left-to-right Mermaid graph.
#[must_use]
pub fn render_mermaid(inventory: &Inventory, edges: &[ServiceEdge]) -> String {
    let mut lines = vec!["graph LR".to_string()];
    lines.extend(inventory.repos.iter().map(|r| format!("  {}[\"{}\"]", node_id(&r.name), r.name)));
    lines.extend(edges.iter().map(|e| {
        format!("  {} -- \"{}\" --> {}", node_id(&e.from), e.label, node_id(&e.to))
    }));
    lines.join("\n") + "\n"
}

/// Reads the current view and writes `org-service-map.mmd`, returning its path.
///
/// A repository without a readable `dependencies_internal.json` contributes
/// a node but no edges.
///
/// # Errors
///
/// Returns [`IntelError::MissingInventory`] before any scan, or a write
/// failure.
pub fn generate_service_map(ctx: &ServiceContext, root: &Path) -> Result<PathBuf, IntelError> {
    let store = SnapshotStore::new(ctx, root);
    let inventory = store.load_inventory(View::Current)?;
    let internal: Vec<(String, DependenciesInternal)> = inventory
        .repos
        .iter()
        .filter_map(|repo| {
            store
                .load_fact(View::Current, &repo.name, FactDomain::DependenciesInternal)
                .map(|deps| (repo.name.clone(), deps))
        })
        .collect();

    let edges = build_edges(&inventory, &internal);
    let path = store.artifact_path(SERVICE_MAP_FILE);
    store.write_text(&path, &render_mermaid(&inventory, &edges))?;
    info!(nodes = inventory.repos.len(), edges = edges.len(), "service map written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, MemFs};
    use crate::model::{InteractionKind, InternalDependency, RepoMetadata};

    fn inventory(names: &[&str]) -> Inventory {
        Inventory {
            repos: names
                .iter()
                .map(|n| RepoMetadata { name: (*n).to_string(), ..RepoMetadata::default() })
                .collect(),
            ..Inventory::default()
        }
    }

    fn deps(pairs: &[(&str, InteractionKind)]) -> DependenciesInternal {
        DependenciesInternal {
            interactions: pairs
                .iter()
                .map(|(target, kind)| InternalDependency {
                    target: (*target).to_string(),
                    kind: *kind,
                    evidence: "package dependency".to_string(),
                })
                .collect(),
            ..DependenciesInternal::default()
        }
    }

    #[test]
    fn node_ids_are_slugs() {
        assert_eq!(node_id("@acme/Order-Service"), "acme_order_service");
        assert_eq!(node_id("billing"), "billing");
        assert_eq!(node_id("@@"), "repo_unknown");
    }

    #[test]
    fn scoped_targets_resolve_and_self_edges_drop() {
        let inv = inventory(&["web", "orders", "acme"]);
        let internal = vec![
            (
                "web".to_string(),
                deps(&[
                    ("@orders/client", InteractionKind::Pkg),
                    ("orders", InteractionKind::Pkg),
                    ("ORDERS_SVC_URL", InteractionKind::Http),
                ]),
            ),
            ("acme".to_string(), deps(&[("@acme/shared", InteractionKind::Pkg)])),
        ];
        let edges = build_edges(&inv, &internal);
        assert_eq!(
            edges,
            vec![ServiceEdge { from: "web".into(), to: "orders".into(), label: "pkg".into() }]
        );
    }

    #[test]
    fn mermaid_lists_nodes_then_edges() {
        let inv = inventory(&["web-app", "orders"]);
        let edges = vec![ServiceEdge { from: "web-app".into(), to: "orders".into(), label: "http".into() }];
        assert_eq!(
            render_mermaid(&inv, &edges),
            "graph LR\n  web_app[\"web-app\"]\n  orders[\"orders\"]\n  web_app -- \"http\" --> orders\n"
        );
    }

    #[test]
    fn service_map_requires_inventory() {
        let ctx = test_context(MemFs::default());
        let err = generate_service_map(&ctx, Path::new("/w")).unwrap_err();
        assert!(matches!(err, IntelError::MissingInventory { .. }));
    }

    #[test]
    fn missing_dependency_files_yield_nodes_only() {
        let ctx = test_context(MemFs::with_files([
            ("/w/.repo-intel/inventory.json", r#"{"repos":[{"name":"web"},{"name":"orders"}]}"#),
            (
                "/w/.repo-intel/repos/web/raw/dependencies_internal.json",
                r#"{"interactions":[{"target":"orders","kind":"http","evidence":"internal host literal"}]}"#,
            ),
        ]));
        let path = generate_service_map(&ctx, Path::new("/w")).unwrap();
        assert_eq!(path, PathBuf::from("/w/.repo-intel/org-service-map.mmd"));
        let map = ctx.fs.read_to_string(&path).unwrap();
        assert_eq!(
            map,
            "graph LR\n  web[\"web\"]\n  orders[\"orders\"]\n  web -- \"http\" --> orders\n"
        );
    }
}
