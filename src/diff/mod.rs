//! Snapshot diffing.
//!
//! Each tracked fact file is reduced to a canonical string per repository
//! (compact JSON, object keys sorted recursively, array order kept), so two
//! serializations differing only in key order compare equal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::context::ServiceContext;
use crate::error::IntelError;
use crate::model::{DiffReport, DiffSection, Inventory};
use crate::snapshot::format_generated_at;
use crate::store::{validate_snapshot_id, FactDomain, SnapshotStore, View};

/// Tracked sections: heading and the fact file compared.
pub const TRACKED_SECTIONS: [(&str, FactDomain); 4] = [
    ("API Surface", FactDomain::ApiSurface),
    ("Dependencies", FactDomain::DependenciesExternal),
    ("Domain Terms", FactDomain::DomainTerms),
    ("Quality Signals", FactDomain::QualitySignals),
];

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Canonical comparison string for a JSON value.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Computes added/removed/changed repository names between two sections.
///
/// Keys are repository names, values canonical strings. All three lists
/// come out sorted.
#[must_use]
pub fn compare_section(
    base: &BTreeMap<String, String>,
    head: &BTreeMap<String, String>,
) -> DiffSection {
    let added = head.keys().filter(|k| !base.contains_key(*k)).cloned().collect();
    let removed = base.keys().filter(|k| !head.contains_key(*k)).cloned().collect();
    let changed = base
        .iter()
        .filter(|(k, v)| head.get(*k).is_some_and(|h| h != *v))
        .map(|(k, _)| k.clone())
        .collect();
    DiffSection { added, removed, changed }
}

/// Loads one section of a snapshot: every repository listed in its
/// inventory, mapped to the canonical string of its fact file (empty when
/// the file is missing or unparsable).
fn load_section(
    store: &SnapshotStore<'_>,
    id: &str,
    inventory: &Inventory,
    domain: FactDomain,
) -> BTreeMap<String, String> {
    let names: BTreeSet<&str> = inventory.repos.iter().map(|r| r.name.as_str()).collect();
    names
        .into_iter()
        .map(|name| {
            let canonical = store
                .load_fact_value(View::Snapshot(id), name, domain)
                .map(|v| canonical_json(&v))
                .unwrap_or_default();
            (name.to_string(), canonical)
        })
        .collect()
}

/// Compares two persisted snapshots.
///
/// # Errors
///
/// Returns [`IntelError::InvalidSnapshotId`] for an identifier that is not a
/// single path segment, or [`IntelError::MissingSnapshot`] if either snapshot
/// was never persisted.
pub fn diff_snapshots(
    ctx: &ServiceContext,
    root: &Path,
    base: &str,
    head: &str,
) -> Result<DiffReport, IntelError> {
    validate_snapshot_id(base)?;
    validate_snapshot_id(head)?;
    let store = SnapshotStore::new(ctx, root);
    let base_inventory = store.load_inventory(View::Snapshot(base))?;
    let head_inventory = store.load_inventory(View::Snapshot(head))?;

    let [api_surface, dependencies, domain_terms, quality_signals] =
        TRACKED_SECTIONS.map(|(_, domain)| {
            compare_section(
                &load_section(&store, base, &base_inventory, domain),
                &load_section(&store, head, &head_inventory, domain),
            )
        });

    Ok(DiffReport {
        generated_at: format_generated_at(ctx.clock.now()),
        base_snapshot: base.to_string(),
        head_snapshot: head.to_string(),
        api_surface,
        dependencies,
        domain_terms,
        quality_signals,
    })
}

fn markdown_list(values: &[String]) -> String {
    if values.is_empty() {
        return "- None".to_string();
    }
    values.iter().map(|v| format!("- {v}")).collect::<Vec<_>>().join("\n")
}

/// Format a [`DiffReport`] as markdown, one `##` section per tracked domain.
#[must_use]
pub fn format_diff(report: &DiffReport) -> String {
    let mut out = String::from("# Repo Intelligence Diff\n\n");
    let _ = writeln!(out, "Base snapshot: {}", report.base_snapshot);
    let _ = writeln!(out, "Head snapshot: {}", report.head_snapshot);
    let sections = [
        &report.api_surface,
        &report.dependencies,
        &report.domain_terms,
        &report.quality_signals,
    ];
    for ((title, _), section) in TRACKED_SECTIONS.iter().zip(sections) {
        let _ = write!(
            out,
            "\n## {title}\n\n### Added\n{}\n\n### Removed\n{}\n\n### Changed\n{}\n",
            markdown_list(&section.added),
            markdown_list(&section.removed),
            markdown_list(&section.changed),
        );
    }
    out
}

/// Diffs two snapshots and writes `diff.json` and `diff.md`.
///
/// # Errors
///
/// Returns an error if either snapshot is missing or a write fails.
pub fn run_diff(
    ctx: &ServiceContext,
    root: &Path,
    base: &str,
    head: &str,
) -> Result<DiffReport, IntelError> {
    let report = diff_snapshots(ctx, root, base, head)?;
    let store = SnapshotStore::new(ctx, root);
    store.write_json(&store.artifact_path("diff.json"), &report)?;
    store.write_text(&store.artifact_path("diff.md"), &format_diff(&report))?;
    info!(base, head, "diff written");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_context, MemFs};

    fn section(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn canonical_form_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": [2, 1], "x": null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": null, "y": [2, 1]}, "b": 1}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":null,"y":[2,1]},"b":1}"#);
    }

    #[test]
    fn canonical_form_keeps_array_order() {
        let a: Value = serde_json::json!(["x", "y"]);
        let b: Value = serde_json::json!(["y", "x"]);
        assert_ne!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn compare_section_splits_added_removed_changed() {
        let base = section(&[("billing", "1"), ("orders", "1"), ("legacy", "1")]);
        let head = section(&[("billing", "1"), ("orders", "2"), ("shipping", "1")]);
        let diff = compare_section(&base, &head);
        assert_eq!(diff.added, vec!["shipping"]);
        assert_eq!(diff.removed, vec!["legacy"]);
        assert_eq!(diff.changed, vec!["orders"]);
    }

    #[test]
    fn reordered_fact_files_are_not_changed() {
        let ctx = test_context(MemFs::with_files([
            ("/w/.repo-intel/snapshots/a/inventory.json", r#"{"repos":[{"name":"orders"}]}"#),
            ("/w/.repo-intel/snapshots/b/inventory.json", r#"{"repos":[{"name":"orders"}]}"#),
            (
                "/w/.repo-intel/snapshots/a/repos/orders/raw/api_surface.json",
                r#"{"routes":[],"cronJobs":[]}"#,
            ),
            (
                "/w/.repo-intel/snapshots/b/repos/orders/raw/api_surface.json",
                r#"{"cronJobs":[],"routes":[]}"#,
            ),
        ]));
        let report = diff_snapshots(&ctx, Path::new("/w"), "a", "b").unwrap();
        assert!(report.api_surface.is_empty());
        assert!(report.quality_signals.is_empty());
    }

    #[test]
    fn presence_follows_each_inventory() {
        let ctx = test_context(MemFs::with_files([
            ("/w/.repo-intel/snapshots/a/inventory.json", r#"{"repos":[{"name":"orders"},{"name":"legacy"}]}"#),
            ("/w/.repo-intel/snapshots/b/inventory.json", r#"{"repos":[{"name":"orders"},{"name":"billing"}]}"#),
            ("/w/.repo-intel/snapshots/b/repos/orders/raw/domain_terms.json", r#"{"topTerms":[]}"#),
        ]));
        let report = diff_snapshots(&ctx, Path::new("/w"), "a", "b").unwrap();
        assert_eq!(report.api_surface.added, vec!["billing"]);
        assert_eq!(report.api_surface.removed, vec!["legacy"]);
        assert!(report.api_surface.changed.is_empty());
        assert_eq!(report.domain_terms.changed, vec!["orders"]);
    }

    #[test]
    fn missing_snapshot_is_fatal() {
        let ctx = test_context(MemFs::with_files([(
            "/w/.repo-intel/snapshots/a/inventory.json",
            r#"{"repos":[]}"#,
        )]));
        let err = diff_snapshots(&ctx, Path::new("/w"), "a", "nope").unwrap_err();
        assert!(matches!(err, IntelError::MissingSnapshot { ref id, .. } if id == "nope"));
    }

    #[test]
    fn path_like_snapshot_ids_are_rejected() {
        let ctx = test_context(MemFs::with_files([(
            "/w/.repo-intel/snapshots/a/inventory.json",
            r#"{"repos":[]}"#,
        )]));
        let err = diff_snapshots(&ctx, Path::new("/w"), "a", "../../a").unwrap_err();
        assert!(matches!(err, IntelError::InvalidSnapshotId { ref id } if id == "../../a"));
    }

    #[test]
    fn run_diff_writes_report_and_markdown() {
        let ctx = test_context(MemFs::with_files([
            ("/w/.repo-intel/snapshots/a/inventory.json", r#"{"repos":[]}"#),
            ("/w/.repo-intel/snapshots/b/inventory.json", r#"{"repos":[{"name":"orders"}]}"#),
        ]));
        run_diff(&ctx, Path::new("/w"), "a", "b").unwrap();
        let md = ctx.fs.read_to_string(Path::new("/w/.repo-intel/diff.md")).unwrap();
        assert!(md.contains("Base snapshot: a\nHead snapshot: b\n"));
        assert!(md.contains("## API Surface\n\n### Added\n- orders\n\n### Removed\n- None"));
        let json: Value =
            serde_json::from_str(&ctx.fs.read_to_string(Path::new("/w/.repo-intel/diff.json")).unwrap())
                .unwrap();
        assert_eq!(json["apiSurface"]["added"][0], "orders");
        assert_eq!(json["generatedAt"], "2025-06-15T10:00:00.000Z");
    }
}
