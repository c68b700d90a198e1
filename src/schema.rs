//! Startup schema introspection: native column types of every described table.

use crate::database::Database;
use crate::descriptor::{Descriptor, Relationship};
use crate::error::AppError;
use crate::sql::{QueryContext, QueryKind, Registry, ScalarKind};
use indexmap::IndexMap;

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaColumn {
    pub table: String,
    pub column: String,
    pub native_type: String,
    pub kind: ScalarKind,
}

impl SchemaColumn {
    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.table, self.column)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TableSchema {
    pub columns: Vec<SchemaColumn>,
    /// Base columns followed by each related table's columns, in join order.
    pub joined: Option<Vec<SchemaColumn>>,
}

impl TableSchema {
    pub fn kind_of(&self, column: &str) -> Option<ScalarKind> {
        self.columns.iter().find(|c| c.column == column).map(|c| c.kind)
    }

    pub fn native_type(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.native_type.as_str())
    }
}

/// Position of one table's columns inside a joined row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSegment {
    pub table: String,
    pub start: usize,
    pub len: usize,
}

/// Column layouts keyed by table, built once and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct SchemaCatalog {
    tables: IndexMap<String, TableSchema>,
}

impl SchemaCatalog {
    pub fn insert(&mut self, table: impl Into<String>, schema: TableSchema) {
        self.tables.insert(table.into(), schema);
    }

    pub fn table(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    pub fn kind_of(&self, table: &str, column: &str) -> Option<ScalarKind> {
        self.table(table).and_then(|t| t.kind_of(column))
    }

    /// True when the backend stores `column` as a native UUID.
    pub fn is_uuid(&self, table: &str, column: &str) -> bool {
        self.table(table)
            .and_then(|t| t.native_type(column))
            .is_some_and(|n| n.eq_ignore_ascii_case("UUID") || n.eq_ignore_ascii_case("UNIQUEIDENTIFIER"))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Split of a `SELECT *` over `base` joined with `relations`: base first, then each join.
    pub fn join_layout(&self, base: &str, relations: &[&Relationship]) -> Result<Vec<JoinSegment>, AppError> {
        let mut out = Vec::with_capacity(relations.len() + 1);
        let mut start = 0;
        let tables = std::iter::once(base).chain(relations.iter().map(|r| r.with_table.as_str()));
        for table in tables {
            let len = self
                .table(table)
                .map(|t| t.columns.len())
                .ok_or_else(|| AppError::Unsupported(format!("table {} was not introspected", table)))?;
            out.push(JoinSegment {
                table: table.to_string(),
                start,
                len,
            });
            start += len;
        }
        Ok(out)
    }

    /// Describe every table, then every table with relationships joined. Sequential.
    pub async fn introspect(db: &Database, registry: &Registry, descriptor: &Descriptor) -> Result<Self, AppError> {
        let mut catalog = SchemaCatalog::default();
        for table in descriptor.table_names() {
            let q = registry.render(QueryKind::IntrospectTable, QueryContext::new(table))?;
            let columns = db
                .describe(&q.sql)
                .await?
                .into_iter()
                .map(|(column, native_type)| SchemaColumn {
                    table: table.to_string(),
                    kind: registry.classify(&native_type),
                    column,
                    native_type,
                })
                .collect();
            catalog.insert(table, TableSchema { columns, joined: None });
        }

        for table in descriptor.table_names() {
            let Some(td) = descriptor.type_descriptor_by_table(table) else {
                continue;
            };
            let relations: Vec<&Relationship> = td.relationship_fields().filter_map(|f| f.relationship.as_ref()).collect();
            if relations.is_empty() {
                continue;
            }
            let q = registry.render(
                QueryKind::IntrospectTableWithRelationships,
                QueryContext::new(table).relations(relations.clone()),
            )?;
            let described = db.describe(&q.sql).await?;
            let layout = catalog.join_layout(table, &relations)?;
            let expected: usize = layout.iter().map(|s| s.len).sum();
            if described.len() != expected {
                return Err(AppError::Unsupported(format!(
                    "joined layout of {} has {} columns, expected {}",
                    table,
                    described.len(),
                    expected
                )));
            }
            let mut joined = Vec::with_capacity(described.len());
            for segment in &layout {
                for (column, native_type) in &described[segment.start..segment.start + segment.len] {
                    joined.push(SchemaColumn {
                        table: segment.table.clone(),
                        column: column.clone(),
                        native_type: native_type.clone(),
                        kind: registry.classify(native_type),
                    });
                }
            }
            if let Some(schema) = catalog.tables.get_mut(table) {
                schema.joined = Some(joined);
            }
        }

        tracing::info!(tables = catalog.len(), backend = registry.backend().as_str(), "schema introspected");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RelationshipKind;

    fn column(table: &str, column: &str, kind: ScalarKind) -> SchemaColumn {
        SchemaColumn {
            table: table.into(),
            column: column.into(),
            native_type: "TEXT".into(),
            kind,
        }
    }

    fn catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::default();
        catalog.insert(
            "equipment",
            TableSchema {
                columns: vec![
                    column("equipment", "id", ScalarKind::Integer),
                    column("equipment", "name", ScalarKind::String),
                    column("equipment", "acquisition_cost", ScalarKind::Float),
                ],
                joined: None,
            },
        );
        catalog.insert(
            "recipes",
            TableSchema {
                columns: vec![
                    column("recipes", "id", ScalarKind::Integer),
                    column("recipes", "equipment_id", ScalarKind::Integer),
                ],
                joined: None,
            },
        );
        catalog
    }

    #[test]
    fn qualified_names_join_table_and_column() {
        assert_eq!(column("equipment", "name", ScalarKind::String).qualified_name(), "equipment_name");
    }

    #[test]
    fn join_layout_follows_relation_order() {
        let rel = Relationship {
            kind: RelationshipKind::OneToMany,
            with_table: "recipes".into(),
            foreign_unique_id_column: "equipment_id".into(),
            local_unique_id_column: "id".into(),
        };
        let layout = catalog().join_layout("equipment", &[&rel, &rel]).unwrap();
        let spans: Vec<(usize, usize)> = layout.iter().map(|s| (s.start, s.len)).collect();
        assert_eq!(spans, vec![(0, 3), (3, 2), (5, 2)]);
        assert_eq!(layout[1].table, "recipes");
    }

    #[test]
    fn uuid_columns_are_recognised_by_native_type() {
        let mut catalog = catalog();
        catalog.insert(
            "manuals",
            TableSchema {
                columns: vec![
                    SchemaColumn {
                        native_type: "UUID".into(),
                        ..column("manuals", "id", ScalarKind::String)
                    },
                    column("manuals", "serial", ScalarKind::String),
                ],
                joined: None,
            },
        );
        assert!(catalog.is_uuid("manuals", "id"));
        assert!(!catalog.is_uuid("manuals", "serial"));
        assert!(!catalog.is_uuid("manuals", "missing"));
        assert_eq!(catalog.table("manuals").unwrap().native_type("serial"), Some("TEXT"));
    }

    #[test]
    fn unknown_tables_have_no_layout() {
        assert!(catalog().join_layout("manuals", &[]).is_err());
        assert_eq!(catalog().kind_of("equipment", "acquisition_cost"), Some(ScalarKind::Float));
        assert_eq!(catalog().kind_of("equipment", "missing"), None);
    }
}
