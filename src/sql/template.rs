//! Named query templates and the context they are rendered from.

use crate::descriptor::Relationship;
use crate::error::AppError;
use crate::value::Value;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    FetchOne,
    FetchOneAsOption,
    FetchCollection,
    FetchCollectionFilterable,
    FetchCollectionAsOptions,
    FetchCollectionAsOptionsFilterable,
    FetchCollectionAsOptionsWithParams,
    UpdateOne,
    CreateOne,
    DeleteOne,
    IntrospectTable,
    IntrospectTableWithRelationships,
}

impl QueryKind {
    pub const ALL: [QueryKind; 12] = [
        QueryKind::FetchOne,
        QueryKind::FetchOneAsOption,
        QueryKind::FetchCollection,
        QueryKind::FetchCollectionFilterable,
        QueryKind::FetchCollectionAsOptions,
        QueryKind::FetchCollectionAsOptionsFilterable,
        QueryKind::FetchCollectionAsOptionsWithParams,
        QueryKind::UpdateOne,
        QueryKind::CreateOne,
        QueryKind::DeleteOne,
        QueryKind::IntrospectTable,
        QueryKind::IntrospectTableWithRelationships,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::FetchOne => "GetSingle",
            QueryKind::FetchOneAsOption => "GetSingleAsOption",
            QueryKind::FetchCollection => "GetCollection",
            QueryKind::FetchCollectionFilterable => "GetCollectionFilterable",
            QueryKind::FetchCollectionAsOptions => "GetCollectionAsOptions",
            QueryKind::FetchCollectionAsOptionsFilterable => "GetCollectionAsOptionsFilterable",
            QueryKind::FetchCollectionAsOptionsWithParams => "GetCollectionAsOptionsWithParams",
            QueryKind::UpdateOne => "UpdateSingle",
            QueryKind::CreateOne => "CreateSingle",
            QueryKind::DeleteOne => "DeleteSingle",
            QueryKind::IntrospectTable => "GetTableSchema",
            QueryKind::IntrospectTableWithRelationships => "GetTableWithRelationshipsSchema",
        }
    }
}

/// Comparison operators accepted in collection filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl FilterOperator {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "<>",
            FilterOperator::Lt => "<",
            FilterOperator::Le => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Ge => ">=",
            FilterOperator::Like => "LIKE",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "eq" => FilterOperator::Eq,
            "ne" => FilterOperator::Ne,
            "lt" => FilterOperator::Lt,
            "le" => FilterOperator::Le,
            "gt" => FilterOperator::Gt,
            "ge" => FilterOperator::Ge,
            "like" => FilterOperator::Like,
            other => {
                return Err(AppError::RequestData(format!("unknown filter operator: {}", other)));
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

/// Everything a template may need. Identifiers come from the descriptor only; values are bound.
#[derive(Clone, Debug, Default)]
pub struct QueryContext<'a> {
    pub table: &'a str,
    pub unique_id_column: Option<&'a str>,
    pub option_name_column: Option<&'a str>,
    /// Columns (with values) written by create/update, in order.
    pub columns: Vec<(&'a str, Value)>,
    /// Relationships joined onto the base table, in declaration order.
    pub relations: Vec<&'a Relationship>,
    pub id: Option<Value>,
    pub filter: Option<Filter>,
    /// Free-text search against the option-name column.
    pub search: Option<String>,
    /// Additional `column = value` constraints, in order.
    pub extra: Vec<(&'a str, Value)>,
}

impl<'a> QueryContext<'a> {
    pub fn new(table: &'a str) -> Self {
        QueryContext {
            table,
            ..Default::default()
        }
    }

    pub fn unique_id(mut self, column: &'a str) -> Self {
        self.unique_id_column = Some(column);
        self
    }

    pub fn option_name(mut self, column: &'a str) -> Self {
        self.option_name_column = Some(column);
        self
    }

    pub fn id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }

    pub fn relations(mut self, relations: Vec<&'a Relationship>) -> Self {
        self.relations = relations;
        self
    }

    pub fn columns(mut self, columns: Vec<(&'a str, Value)>) -> Self {
        self.columns = columns;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn extra(mut self, extra: Vec<(&'a str, Value)>) -> Self {
        self.extra = extra;
        self
    }
}
