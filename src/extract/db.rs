//! Data model: Prisma schema, SQL DDL and ORM entity decorators.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ServiceContext;
use crate::extract::text::dedupe_by_key;
use crate::model::{DataEntity, DataRelationship, DbModelSummary};
use crate::survey::{in_any_dir, RepoTree};

const PRISMA_SCHEMA: &str = "prisma/schema.prisma";

static PRISMA_MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bmodel\s+(\w+)\s*\{([^}]*)\}").expect("valid prisma model regex")
});

static PRISMA_RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\w+\s+(\w+)(?:\?|\[\])?\s+@relation").expect("valid prisma relation regex")
});

static SQL_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)create\s+table\s+(?:if\s+not\s+exists\s+)?"?([a-zA-Z0-9_]+)"?"#)
        .expect("valid create table regex")
});

static ENTITY_DECORATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@Entity\(\s*(?:['"`]([^'"`]+)['"`])?\s*\)(?:\s*export)?(?:\s*class\s+(\w+))?"#)
        .expect("valid entity decorator regex")
});

fn prisma_models(schema: &str) -> (Vec<DataEntity>, Vec<DataRelationship>) {
    let mut entities = Vec::new();
    let mut relationships = Vec::new();
    for model in PRISMA_MODEL.captures_iter(schema) {
        let name = &model[1];
        entities.push(DataEntity { name: name.to_string(), source: PRISMA_SCHEMA.to_string() });
        for relation in PRISMA_RELATION.captures_iter(&model[2]) {
            relationships.push(DataRelationship {
                from: name.to_string(),
                to: relation[1].to_string(),
                relation: "relation".to_string(),
                source: PRISMA_SCHEMA.to_string(),
            });
        }
    }
    (entities, relationships)
}

fn sql_tables<'a>(file: &str, content: &'a str) -> impl Iterator<Item = DataEntity> + 'a {
    let file = file.to_string();
    SQL_TABLE
        .captures_iter(content)
        .map(move |caps| DataEntity { name: caps[1].to_string(), source: file.clone() })
}

fn decorated_entities<'a>(file: &'a str, content: &'a str) -> impl Iterator<Item = DataEntity> + 'a {
    ENTITY_DECORATOR.captures_iter(content).filter_map(move |caps| {
        let name = caps.get(1).or_else(|| caps.get(2))?;
        Some(DataEntity { name: name.as_str().to_string(), source: file.to_string() })
    })
}

/// Extracts entities and relationships declared anywhere in the repository.
///
/// Output is deduplicated on the full record and sorted, so repeated
/// extraction over the same tree is byte-identical.
#[must_use]
pub fn extract_db_models(ctx: &ServiceContext, tree: &RepoTree) -> DbModelSummary {
    let schema = ctx.fs.read_or_empty(&tree.abs(PRISMA_SCHEMA));
    let (mut entities, relationships) = prisma_models(&schema);

    for file in tree.files_with_extension(&["sql"]) {
        let content = ctx.fs.read_or_empty(&tree.abs(file));
        entities.extend(sql_tables(file, &content));
    }

    for file in tree.files_with_extension(&["ts", "js"]) {
        if in_any_dir(file, &["dist"]) {
            continue;
        }
        let content = ctx.fs.read_or_empty(&tree.abs(file));
        entities.extend(decorated_entities(file, &content));
    }

    DbModelSummary {
        entities: dedupe_by_key(entities, |e| vec![e.name.as_str(), e.source.as_str()]),
        relationships: dedupe_by_key(relationships, |r| {
            vec![r.from.as_str(), r.to.as_str(), r.relation.as_str(), r.source.as_str()]
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::testing::{test_context, MemFs};

    const SCHEMA: &str = r"
model Order {
  id         Int       @id
  customer   Customer  @relation(fields: [customerId], references: [id])
  customerId Int
  invoice    Invoice?  @relation(fields: [invoiceId], references: [id])
  lines      OrderLine[]
}

model Customer {
  id     Int     @id
  orders Order[]
}
";

    #[test]
    fn prisma_models_and_relations() {
        let ctx = test_context(MemFs::with_files([("/r/prisma/schema.prisma", SCHEMA)]));
        let tree = RepoTree::from_files(Path::new("/r"), &["prisma/schema.prisma"]);
        let models = extract_db_models(&ctx, &tree);
        let names: Vec<&str> = models.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Order"]);
        let edges: Vec<(&str, &str)> =
            models.relationships.iter().map(|r| (r.from.as_str(), r.to.as_str())).collect();
        assert_eq!(edges, vec![("Order", "Customer"), ("Order", "Invoice")]);
    }

    #[test]
    fn sql_tables_and_entity_decorators() {
        let ctx = test_context(MemFs::with_files([
            ("/r/migrations/001.sql", "CREATE TABLE IF NOT EXISTS \"shipments\" (id int);\ncreate table parcels (id int);"),
            ("/r/src/invoice.entity.ts", "@Entity('invoices')\nexport class Invoice {}"),
            ("/r/src/refund.entity.ts", "@Entity()\nexport class Refund {}"),
            ("/r/dist/invoice.entity.js", "@Entity('stale')"),
        ]));
        let tree = RepoTree::from_files(
            Path::new("/r"),
            &["migrations/001.sql", "src/invoice.entity.ts", "src/refund.entity.ts", "dist/invoice.entity.js"],
        );
        let models = extract_db_models(&ctx, &tree);
        let names: Vec<(&str, &str)> =
            models.entities.iter().map(|e| (e.name.as_str(), e.source.as_str())).collect();
        assert_eq!(
            names,
            vec![
                ("Refund", "src/refund.entity.ts"),
                ("invoices", "src/invoice.entity.ts"),
                ("parcels", "migrations/001.sql"),
                ("shipments", "migrations/001.sql"),
            ]
        );
    }

    #[test]
    fn extraction_is_idempotent_and_deduplicated() {
        let ctx = test_context(MemFs::with_files([(
            "/r/schema.sql",
            "CREATE TABLE orders (id int);\nCREATE TABLE orders (id int);",
        )]));
        let tree = RepoTree::from_files(Path::new("/r"), &["schema.sql"]);
        let first = extract_db_models(&ctx, &tree);
        let second = extract_db_models(&ctx, &tree);
        assert_eq!(first.entities.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_inputs_yield_empty_model() {
        let ctx = test_context(MemFs::default());
        let tree = RepoTree::from_files(Path::new("/r"), &["src/index.ts"]);
        assert_eq!(extract_db_models(&ctx, &tree), DbModelSummary::default());
    }
}
