//! Domain term ranker.
//!
//! Every evidence string is tokenized; each token earns the weight of its
//! evidence source and remembers the source tag. Terms are ranked by score
//! descending, then term ascending, and truncated.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::RankerConfig;
use crate::context::ServiceContext;
use crate::extract::text::{tokenize, unique_sorted};
use crate::model::{DbModelSummary, DomainTerm, DomainTerms, RouteDescriptor};
use crate::survey::RepoTree;

static DECLARED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:interface|class|enum)\s+([A-Za-z_$][\w$]*)|\btype\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*=",
    )
    .expect("valid declared type regex")
});

/// Where a piece of vocabulary evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSource {
    /// Top-level folder name.
    Folder,
    /// Route path segment.
    Route,
    /// Data entity name.
    Entity,
    /// Relationship endpoint name.
    Relation,
    /// Declared type, interface, class or enum name.
    Type,
}

impl EvidenceSource {
    /// Tag recorded in a term's source list.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Route => "route",
            Self::Entity => "entity",
            Self::Relation => "relation",
            Self::Type => "type",
        }
    }

    /// Weight of this source under `config`.
    #[must_use]
    pub fn weight(self, config: &RankerConfig) -> u32 {
        match self {
            Self::Folder => config.folder_weight,
            Self::Route => config.route_weight,
            Self::Entity => config.entity_weight,
            Self::Relation => config.relation_weight,
            Self::Type => config.type_weight,
        }
    }
}

/// Ranks tokens from `(source, raw string)` evidence pairs.
#[must_use]
pub fn rank_terms<'a, I>(evidence: I, config: &RankerConfig) -> DomainTerms
where
    I: IntoIterator<Item = (EvidenceSource, &'a str)>,
{
    let mut scores: BTreeMap<String, (u32, BTreeSet<&'static str>)> = BTreeMap::new();
    for (source, raw) in evidence {
        for token in tokenize(raw, config) {
            let entry = scores.entry(token).or_default();
            entry.0 += source.weight(config);
            entry.1.insert(source.tag());
        }
    }

    let mut ranked: Vec<DomainTerm> = scores
        .into_iter()
        .map(|(term, (score, sources))| DomainTerm {
            term,
            score,
            sources: sources.into_iter().map(str::to_string).collect(),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    ranked.truncate(config.max_terms);
    DomainTerms { top_terms: ranked }
}

/// Declared type names across the source files, unique and sorted.
fn declared_type_names(ctx: &ServiceContext, tree: &RepoTree, source_files: &[String]) -> Vec<String> {
    unique_sorted(source_files.iter().flat_map(|file| {
        let code = ctx.fs.read_or_empty(&tree.abs(file));
        DECLARED_TYPE
            .captures_iter(&code)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string()))
            .collect::<Vec<_>>()
    }))
}

/// Ranks the domain vocabulary of one repository.
#[must_use]
pub fn extract_domain_terms(
    ctx: &ServiceContext,
    tree: &RepoTree,
    source_files: &[String],
    routes: &[RouteDescriptor],
    db: &DbModelSummary,
    config: &RankerConfig,
) -> DomainTerms {
    let folders = tree.top_level_folders();
    let type_names = declared_type_names(ctx, tree, source_files);

    let evidence = folders
        .iter()
        .map(|f| (EvidenceSource::Folder, f.as_str()))
        .chain(routes.iter().flat_map(|r| {
            r.path.split('/').filter(|s| !s.is_empty()).map(|s| (EvidenceSource::Route, s))
        }))
        .chain(db.entities.iter().map(|e| (EvidenceSource::Entity, e.name.as_str())))
        .chain(db.relationships.iter().flat_map(|r| {
            [(EvidenceSource::Relation, r.from.as_str()), (EvidenceSource::Relation, r.to.as_str())]
        }))
        .chain(type_names.iter().map(|t| (EvidenceSource::Type, t.as_str())));

    rank_terms(evidence, config)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::testing::{test_context, MemFs};
    use crate::model::{DataEntity, DataRelationship};

    #[test]
    fn route_term_outranks_type_term() {
        let config = RankerConfig::default();
        let terms = rank_terms(
            [(EvidenceSource::Type, "Widget"), (EvidenceSource::Route, "shipments")],
            &config,
        );
        let order: Vec<(&str, u32)> =
            terms.top_terms.iter().map(|t| (t.term.as_str(), t.score)).collect();
        assert_eq!(order, vec![("shipments", 3), ("widget", 1)]);
    }

    #[test]
    fn shared_term_sums_weights_and_sources() {
        let config = RankerConfig::default();
        let terms = rank_terms(
            [(EvidenceSource::Route, "invoices"), (EvidenceSource::Type, "Invoices")],
            &config,
        );
        assert_eq!(
            terms.top_terms,
            vec![DomainTerm {
                term: "invoices".into(),
                score: 4,
                sources: vec!["route".into(), "type".into()],
            }]
        );
    }

    #[test]
    fn ties_break_by_term_and_list_is_capped() {
        let config = RankerConfig { max_terms: 2, ..RankerConfig::default() };
        let terms = rank_terms(
            [
                (EvidenceSource::Folder, "zebra"),
                (EvidenceSource::Folder, "apple"),
                (EvidenceSource::Folder, "mango"),
            ],
            &config,
        );
        let names: Vec<&str> = terms.top_terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["apple", "mango"]);
    }

    #[test]
    fn all_evidence_sources_contribute() {
        let ctx = test_context(MemFs::with_files([(
            "/r/src/billing.ts",
            "export interface BillingAccount {}\nexport type LedgerEntry<T> = { v: T };\nenum Currency {}",
        )]));
        let files = vec!["src/billing.ts".to_string()];
        let tree = RepoTree::from_files(Path::new("/r"), &["payments/x.ts", "src/billing.ts"]);
        let routes = vec![RouteDescriptor {
            method: "GET".into(),
            path: "/refunds/:id".into(),
            file: "src/app.ts".into(),
            ..RouteDescriptor::default()
        }];
        let db = DbModelSummary {
            entities: vec![DataEntity { name: "Refund".into(), source: "s".into() }],
            relationships: vec![DataRelationship {
                from: "Refund".into(),
                to: "Payment".into(),
                relation: "relation".into(),
                source: "s".into(),
            }],
        };
        let terms =
            extract_domain_terms(&ctx, &tree, &files, &routes, &db, &RankerConfig::default());
        let top = &terms.top_terms[0];
        assert_eq!(top.term, "refund");
        assert_eq!(top.score, 7);
        assert_eq!(top.sources, vec!["entity", "relation"]);
        let payments = terms.top_terms.iter().find(|t| t.term == "payments").unwrap();
        assert_eq!(payments.sources, vec!["folder"]);
        for expected in ["billing", "account", "ledger", "entry", "currency", "refunds", "payment"] {
            assert!(terms.top_terms.iter().any(|t| t.term == expected), "missing {expected}");
        }
    }
}
