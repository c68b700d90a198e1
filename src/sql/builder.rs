//! Renders parameterized statements for a dialect from a query kind and its context.

use crate::error::TemplateError;
use crate::sql::{Dialect, InsertedId, QueryContext, QueryKind};
use crate::value::Value;

/// Rendered statement plus the values to bind, in placeholder order.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

struct Renderer<'d> {
    dialect: &'d dyn Dialect,
    kind: QueryKind,
    params: Vec<Value>,
}

impl<'d> Renderer<'d> {
    fn bind(&mut self, v: Value) -> String {
        self.params.push(v);
        self.dialect.placeholder(self.params.len())
    }

    fn q(&self, ident: &str) -> String {
        self.dialect.quote(ident)
    }

    fn missing(&self, missing: &'static str) -> TemplateError {
        TemplateError::MissingContext {
            kind: self.kind.name(),
            missing,
        }
    }

    fn require<T>(&self, v: Option<T>, missing: &'static str) -> Result<T, TemplateError> {
        v.ok_or_else(|| self.missing(missing))
    }

    /// `"t" AS "_t" LEFT JOIN ...` for every relation, in order.
    fn from_with_joins(&self, ctx: &QueryContext<'_>) -> String {
        let base_alias = self.q(&format!("_{}", ctx.table));
        let mut out = format!("{} AS {}", self.q(ctx.table), base_alias);
        for rel in &ctx.relations {
            let related = self.q(&rel.with_table);
            out.push_str(&format!(
                " LEFT JOIN {} ON {}.{} = {}.{}",
                related,
                related,
                self.q(&rel.foreign_unique_id_column),
                base_alias,
                self.q(&rel.local_unique_id_column),
            ));
        }
        out
    }

    fn render(mut self, ctx: QueryContext<'_>) -> Result<QueryBuf, TemplateError> {
        if ctx.table.is_empty() {
            return Err(self.missing("table name"));
        }
        let table = self.q(ctx.table);
        let sql = match self.kind {
            QueryKind::FetchOne => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let id = self.require(ctx.id.clone(), "id")?;
                let from = self.from_with_joins(&ctx);
                let alias = self.q(&format!("_{}", ctx.table));
                let ph = self.bind(id);
                format!("SELECT * FROM {} WHERE {}.{} = {}", from, alias, self.q(uid), ph)
            }
            QueryKind::FetchOneAsOption => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let name = self.require(ctx.option_name_column, "option name column")?;
                let id = self.require(ctx.id.clone(), "id")?;
                let ph = self.bind(id);
                format!(
                    "SELECT {}, {} FROM {} WHERE {} = {}",
                    self.q(uid),
                    self.q(name),
                    table,
                    self.q(uid),
                    ph
                )
            }
            QueryKind::FetchCollection => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                format!("SELECT * FROM {} ORDER BY {} ASC", table, self.q(uid))
            }
            QueryKind::FetchCollectionFilterable => {
                let filter = self.require(ctx.filter.clone(), "filter")?;
                let from = self.from_with_joins(&ctx);
                let alias = self.q(&format!("_{}", ctx.table));
                let ph = self.bind(filter.value);
                let mut sql = format!(
                    "SELECT * FROM {} WHERE {}.{} {} {}",
                    from,
                    alias,
                    self.q(&filter.column),
                    filter.operator.sql(),
                    ph
                );
                if let Some(uid) = ctx.unique_id_column {
                    sql.push_str(&format!(" ORDER BY {}.{} ASC", alias, self.q(uid)));
                }
                sql
            }
            QueryKind::FetchCollectionAsOptions => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let name = self.require(ctx.option_name_column, "option name column")?;
                format!(
                    "SELECT {}, {} FROM {} ORDER BY {} ASC",
                    self.q(uid),
                    self.q(name),
                    table,
                    self.q(uid)
                )
            }
            QueryKind::FetchCollectionAsOptionsFilterable | QueryKind::FetchCollectionAsOptionsWithParams => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let name = self.require(ctx.option_name_column, "option name column")?;
                let term = self.require(ctx.search.clone(), "search term")?;
                if self.kind == QueryKind::FetchCollectionAsOptionsWithParams && ctx.extra.is_empty() {
                    return Err(self.missing("extra equality parameters"));
                }
                let like = self.dialect.like_operand(&self.q(name));
                let ph = self.bind(Value::String(format!("%{}%", term)));
                let mut sql = format!(
                    "SELECT {}, {} FROM {} WHERE {} LIKE {}",
                    self.q(uid),
                    self.q(name),
                    table,
                    like,
                    ph
                );
                if self.kind == QueryKind::FetchCollectionAsOptionsWithParams {
                    for (col, val) in &ctx.extra {
                        let ph = self.bind(val.clone());
                        sql.push_str(&format!(" AND {} = {}", self.q(col), ph));
                    }
                }
                sql.push_str(&format!(" ORDER BY {} ASC", self.q(uid)));
                sql
            }
            QueryKind::UpdateOne => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let id = self.require(ctx.id.clone(), "id")?;
                if ctx.columns.is_empty() {
                    return Err(self.missing("column names"));
                }
                let mut sets = Vec::with_capacity(ctx.columns.len());
                for (col, val) in &ctx.columns {
                    let ph = self.bind(val.clone());
                    sets.push(format!("{} = {}", self.q(col), ph));
                }
                let ph = self.bind(id);
                format!("UPDATE {} SET {} WHERE {} = {}", table, sets.join(", "), self.q(uid), ph)
            }
            QueryKind::CreateOne => {
                if ctx.columns.is_empty() {
                    return Err(self.missing("column names"));
                }
                let cols: Vec<String> = ctx.columns.iter().map(|(c, _)| self.q(c)).collect();
                let mut placeholders = Vec::with_capacity(ctx.columns.len());
                for (_, val) in &ctx.columns {
                    placeholders.push(self.bind(val.clone()));
                }
                match self.dialect.inserted_id() {
                    InsertedId::LastRowId => format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        table,
                        cols.join(", "),
                        placeholders.join(", ")
                    ),
                    InsertedId::Output => {
                        let uid = self.require(ctx.unique_id_column, "unique id column")?;
                        format!(
                            "INSERT INTO {} ({}) OUTPUT INSERTED.{} VALUES ({})",
                            table,
                            cols.join(", "),
                            self.q(uid),
                            placeholders.join(", ")
                        )
                    }
                    InsertedId::Returning => {
                        let uid = self.require(ctx.unique_id_column, "unique id column")?;
                        format!(
                            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                            table,
                            cols.join(", "),
                            placeholders.join(", "),
                            self.q(uid)
                        )
                    }
                }
            }
            QueryKind::DeleteOne => {
                let uid = self.require(ctx.unique_id_column, "unique id column")?;
                let id = self.require(ctx.id.clone(), "id")?;
                let ph = self.bind(id);
                format!("DELETE FROM {} WHERE {} = {}", table, self.q(uid), ph)
            }
            QueryKind::IntrospectTable => self.dialect.select_one_row(&format!("* FROM {}", table)),
            QueryKind::IntrospectTableWithRelationships => {
                if ctx.relations.is_empty() {
                    return Err(self.missing("relationships"));
                }
                let from = self.from_with_joins(&ctx);
                self.dialect.select_one_row(&format!("* FROM {}", from))
            }
        };
        Ok(QueryBuf {
            sql,
            params: self.params,
        })
    }
}

/// Render `kind` for `dialect`. Pure: no I/O, values only ever appear in `params`.
pub fn render(dialect: &dyn Dialect, kind: QueryKind, ctx: QueryContext<'_>) -> Result<QueryBuf, TemplateError> {
    Renderer {
        dialect,
        kind,
        params: Vec::new(),
    }
    .render(ctx)
}
