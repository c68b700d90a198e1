//! Resolved descriptor model: validated and typed for runtime use.

use crate::descriptor::{OptionConfig, RelationshipKind};
use std::collections::HashMap;

/// Client-visible type of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowType {
    Text { multi_line: bool },
    Money(Money),
    Date,
    DateTime,
    Time,
    Choice(Vec<OptionConfig>),
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Money {
    pub amount_key: String,
    pub amount_column: String,
    pub currency_key: Option<String>,
    pub currency_column: Option<String>,
    pub currency_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub with_table: String,
    pub foreign_unique_id_column: String,
    pub local_unique_id_column: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: String,
    pub name: String,
    /// Raw type name as declared (e.g. "text", "date", "money").
    pub type_name: String,
    pub workflow_type: WorkflowType,
    pub from_column: Option<String>,
    pub relationship: Option<Relationship>,
}

impl Field {
    pub fn is_relationship(&self) -> bool {
        self.relationship.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    pub key: String,
    pub name: String,
    pub table_name: String,
    pub unique_id_column: String,
    pub column_as_option_name: String,
    pub options_available: bool,
    pub fetch_one_available: bool,
    pub fields: Vec<Field>,
}

impl TypeDescriptor {
    /// Fields carrying a relationship, in declaration order.
    pub fn relationship_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relationship())
    }

    /// Fields without a relationship, in declaration order.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_relationship())
    }

    /// Column and declared type behind a request parameter name.
    /// Money sub-keys map to their amount/currency columns; date fields report their kind.
    pub fn column_for_parameter(&self, param: &str) -> Option<(&str, &str)> {
        for field in &self.fields {
            match &field.workflow_type {
                WorkflowType::Money(money) => {
                    if money.amount_key == param {
                        return Some((money.amount_column.as_str(), field.type_name.as_str()));
                    }
                    if money.currency_key.as_deref() == Some(param) {
                        if let Some(col) = money.currency_column.as_deref() {
                            return Some((col, field.type_name.as_str()));
                        }
                    }
                }
                WorkflowType::Date if field.key == param => {
                    return field.from_column.as_deref().map(|c| (c, "date"));
                }
                WorkflowType::DateTime if field.key == param => {
                    return field.from_column.as_deref().map(|c| (c, "datetime"));
                }
                WorkflowType::Time if field.key == param => {
                    return field.from_column.as_deref().map(|c| (c, "time"));
                }
                _ if field.key == param => {
                    return field.from_column.as_deref().map(|c| (c, field.type_name.as_str()));
                }
                _ => {}
            }
        }
        None
    }

    /// Target columns for the payload keys the client supplied, in field declaration order.
    /// Returns (payload key, column) pairs.
    pub fn columns_for_payload<'a, V>(&'a self, payload: &HashMap<String, V>) -> Vec<(&'a str, &'a str)> {
        let mut out = Vec::new();
        for field in &self.fields {
            match &field.workflow_type {
                WorkflowType::Money(money) => {
                    if payload.contains_key(&money.amount_key) {
                        out.push((money.amount_key.as_str(), money.amount_column.as_str()));
                    }
                    if let (Some(key), Some(col)) = (&money.currency_key, &money.currency_column) {
                        if payload.contains_key(key) {
                            out.push((key.as_str(), col.as_str()));
                        }
                    }
                }
                _ => {
                    if field.is_relationship() {
                        continue;
                    }
                    if let Some(col) = field.from_column.as_deref() {
                        if payload.contains_key(&field.key) {
                            out.push((field.key.as_str(), col));
                        }
                    }
                }
            }
        }
        out
    }
}

/// The whole descriptor, immutable after load.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub key: String,
    pub name: String,
    pub description: String,
    pub version: i64,
    pub protocol_version: i64,
    pub type_descriptors: Vec<TypeDescriptor>,
    /// The document as loaded, served back to the client.
    pub document: serde_json::Value,
}

impl Descriptor {
    /// Keeps the last match when several type descriptors share a table.
    pub fn type_descriptor_by_table(&self, table: &str) -> Option<&TypeDescriptor> {
        self.type_descriptors.iter().rev().find(|td| td.table_name == table)
    }

    pub fn type_descriptor_by_key(&self, key: &str) -> Option<&TypeDescriptor> {
        self.type_descriptors.iter().find(|td| td.key == key)
    }

    /// Distinct table names in declaration order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for td in &self.type_descriptors {
            if !out.contains(&td.table_name.as_str()) {
                out.push(td.table_name.as_str());
            }
        }
        out
    }
}
