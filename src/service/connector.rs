//! Connector operations: one statement per call, rows formatted for the workflow client.

use crate::database::{Database, DecodedRow};
use crate::descriptor::{Descriptor, Relationship, TypeDescriptor};
use crate::error::{AppError, FormatError};
use crate::format::{self, Formatter, ResourceRow, Shape};
use crate::request::{coerce, uuid_value, FilterExpr, Payload};
use crate::schema::SchemaCatalog;
use crate::sql::{Filter, InsertedId, QueryContext, QueryKind, Registry, ScalarKind};
use crate::value::Value;

/// Query parameter carrying the filter expression or option search term.
pub const FILTER_PARAM: &str = "filter";

pub struct ConnectorService<'a> {
    db: &'a Database,
    registry: &'a Registry,
    descriptor: &'a Descriptor,
    schemas: &'a SchemaCatalog,
}

impl<'a> ConnectorService<'a> {
    pub fn new(db: &'a Database, registry: &'a Registry, descriptor: &'a Descriptor, schemas: &'a SchemaCatalog) -> Self {
        ConnectorService {
            db,
            registry,
            descriptor,
            schemas,
        }
    }

    pub fn type_descriptor(&self, key: &str) -> Result<&'a TypeDescriptor, AppError> {
        self.descriptor
            .type_descriptor_by_key(key)
            .ok_or_else(|| AppError::NotFound(format!("no resource named {}", key)))
    }

    fn kind_of(&self, td: &TypeDescriptor, column: &str) -> ScalarKind {
        self.schemas.kind_of(&td.table_name, column).unwrap_or(ScalarKind::String)
    }

    /// Client value converted for binding against `column` of `td`.
    fn column_value(&self, td: &TypeDescriptor, column: &str, value: Value) -> Result<Value, AppError> {
        let value = coerce(column, value, self.kind_of(td, column))?;
        if self.schemas.is_uuid(&td.table_name, column) {
            return uuid_value(column, value);
        }
        Ok(value)
    }

    fn id_value(&self, td: &TypeDescriptor, id: &str) -> Result<Value, AppError> {
        self.column_value(td, &td.unique_id_column, Value::from(id))
    }

    /// Payload values bound for their target columns, in field declaration order.
    fn column_values(&self, td: &'a TypeDescriptor, payload: &Payload) -> Result<Vec<(&'a str, Value)>, AppError> {
        let mut out = Vec::new();
        for (key, column) in td.columns_for_payload(payload.values()) {
            let value = payload.get(key).cloned().unwrap_or(Value::Null);
            out.push((column, self.column_value(td, column, value)?));
        }
        if out.is_empty() {
            return Err(AppError::RequestData(format!(
                "request contains no fields of {}",
                td.key
            )));
        }
        Ok(out)
    }

    async fn fetch(&self, kind: QueryKind, ctx: QueryContext<'_>) -> Result<Vec<DecodedRow>, AppError> {
        let q = self.registry.render(kind, ctx)?;
        self.db.fetch_all(&q, self.registry).await
    }

    async fn fetch_one_rows(&self, td: &TypeDescriptor, id: Value) -> Result<Vec<ResourceRow>, AppError> {
        let fields: Vec<(&str, &Relationship)> = td
            .relationship_fields()
            .filter_map(|f| f.relationship.as_ref().map(|r| (f.key.as_str(), r)))
            .collect();
        let relations: Vec<&Relationship> = fields.iter().map(|(_, r)| *r).collect();
        let ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .id(id)
            .relations(relations.clone());
        let rows = self.fetch(QueryKind::FetchOne, ctx).await?;
        if relations.is_empty() {
            return Ok(format::plain(&td.table_name, rows));
        }
        let layout = self.schemas.join_layout(&td.table_name, &relations)?;
        let mut keys: Vec<(&str, &str)> = Vec::with_capacity(fields.len());
        for (key, rel) in &fields {
            let related = self
                .descriptor
                .type_descriptor_by_table(&rel.with_table)
                .ok_or_else(|| FormatError::UnknownTable(rel.with_table.clone()))?;
            keys.push((*key, related.unique_id_column.as_str()));
        }
        Ok(format::assemble(&td.table_name, &td.unique_id_column, &layout, &keys, rows)?)
    }

    pub async fn fetch_one(&self, key: &str, id: &str, denormalize: bool) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let rows = self.fetch_one_rows(td, self.id_value(td, id)?).await?;
        Ok(Formatter::new(self.descriptor)
            .denormalize(denormalize)
            .format(Shape::Single, &rows)?)
    }

    pub async fn fetch_one_as_option(&self, key: &str, id: &str) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .option_name(&td.column_as_option_name)
            .id(self.id_value(td, id)?);
        let rows = self.fetch(QueryKind::FetchOneAsOption, ctx).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::SingleOption, &format::plain(&td.table_name, rows))?)
    }

    pub async fn fetch_collection(&self, key: &str) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let ctx = QueryContext::new(&td.table_name).unique_id(&td.unique_id_column);
        let rows = self.fetch(QueryKind::FetchCollection, ctx).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::Collection, &format::plain(&td.table_name, rows))?)
    }

    pub async fn fetch_collection_filtered(&self, key: &str, filter: &FilterExpr) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let (column, _) = td
            .column_for_parameter(&filter.param)
            .ok_or_else(|| AppError::RequestData(format!("{} cannot be filtered by {}", td.key, filter.param)))?;
        let value = self.column_value(td, column, Value::from(filter.value.as_str()))?;
        let ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .filter(Filter {
                column: column.to_string(),
                operator: filter.operator,
                value,
            });
        let rows = self.fetch(QueryKind::FetchCollectionFilterable, ctx).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::Collection, &format::plain(&td.table_name, rows))?)
    }

    /// Option list, optionally narrowed by a search term and `param=value` equality filters.
    pub async fn fetch_options(&self, key: &str, params: &Payload) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let search = params.get_str(FILTER_PARAM).map(str::to_string);

        let mut extra = Vec::new();
        let mut names: Vec<&String> = params.values().keys().filter(|k| k.as_str() != FILTER_PARAM).collect();
        names.sort();
        for name in names {
            let Some((column, _)) = td.column_for_parameter(name) else {
                tracing::debug!(param = %name, resource = %td.key, "ignoring unknown option parameter");
                continue;
            };
            let value = params.get(name).cloned().unwrap_or(Value::Null);
            extra.push((column, self.column_value(td, column, value)?));
        }

        let mut ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .option_name(&td.column_as_option_name);
        let kind = if !extra.is_empty() {
            ctx = ctx.search(search.unwrap_or_default()).extra(extra);
            QueryKind::FetchCollectionAsOptionsWithParams
        } else if let Some(term) = search {
            ctx = ctx.search(term);
            QueryKind::FetchCollectionAsOptionsFilterable
        } else {
            QueryKind::FetchCollectionAsOptions
        };
        let rows = self.fetch(kind, ctx).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::OptionCollection, &format::plain(&td.table_name, rows))?)
    }

    /// Insert one row and return it as a single resource.
    pub async fn create(&self, key: &str, payload: &Payload) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let columns = self.column_values(td, payload)?;
        let supplied_id = columns
            .iter()
            .find(|(c, _)| *c == td.unique_id_column)
            .map(|(_, v)| v.clone());
        let ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .columns(columns);
        let q = self.registry.render(QueryKind::CreateOne, ctx)?;

        let id = match self.registry.dialect().inserted_id() {
            InsertedId::LastRowId => {
                let done = self.db.execute(&q).await?;
                supplied_id.or_else(|| done.last_insert_id.map(Value::Integer))
            }
            InsertedId::Output | InsertedId::Returning => self
                .db
                .fetch_all(&q, self.registry)
                .await?
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .map(|(_, v)| v),
        };
        let id = id.ok_or_else(|| AppError::NotFound(format!("created {} row reported no id", td.key)))?;
        let id = self.column_value(td, &td.unique_id_column, id)?;
        tracing::info!(resource = %td.key, id = ?id, "resource created");

        let rows = self.fetch_one_rows(td, id).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::Single, &rows)?)
    }

    pub async fn update(&self, key: &str, id: &str, payload: &Payload) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let id = self.id_value(td, id)?;
        let ctx = QueryContext::new(&td.table_name)
            .unique_id(&td.unique_id_column)
            .id(id.clone())
            .columns(self.column_values(td, payload)?);
        let q = self.registry.render(QueryKind::UpdateOne, ctx)?;
        let done = self.db.execute(&q).await?;
        if done.rows_affected == 0 {
            return Err(AppError::NotFound(format!("{} {}", td.key, id.to_json())));
        }
        let rows = self.fetch_one_rows(td, id).await?;
        Ok(Formatter::new(self.descriptor).format(Shape::Single, &rows)?)
    }

    /// Delete one row; returns the resource as it was before the delete.
    pub async fn delete(&self, key: &str, id: &str) -> Result<Value, AppError> {
        let td = self.type_descriptor(key)?;
        let id = self.id_value(td, id)?;
        let before = self.fetch_one_rows(td, id.clone()).await?;
        if before.is_empty() {
            return Err(AppError::NotFound(format!("{} {}", td.key, id.to_json())));
        }
        let formatted = Formatter::new(self.descriptor).format(Shape::Single, &before)?;
        let ctx = QueryContext::new(&td.table_name).unique_id(&td.unique_id_column).id(id);
        let q = self.registry.render(QueryKind::DeleteOne, ctx)?;
        self.db.execute(&q).await?;
        Ok(formatted)
    }
}
