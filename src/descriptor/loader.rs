//! Load the descriptor from raw bytes or a file path.

use crate::descriptor::resolved::{Descriptor, Field, Money, Relationship, TypeDescriptor, WorkflowType};
use crate::descriptor::types::*;
use crate::descriptor::{validate, MONEY_TYPE};
use crate::error::DescriptorError;
use std::path::Path;

/// Parse, validate and resolve a descriptor document.
pub fn load(bytes: &[u8]) -> Result<Descriptor, DescriptorError> {
    let document: serde_json::Value = serde_json::from_slice(bytes)?;
    let config: DescriptorConfig = serde_json::from_value(document.clone())?;
    validate(&config)?;
    Ok(resolve(config, document))
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Descriptor, DescriptorError> {
    let bytes = std::fs::read(path.as_ref())?;
    let descriptor = load(&bytes)?;
    tracing::info!(
        path = %path.as_ref().display(),
        type_descriptors = descriptor.type_descriptors.len(),
        "descriptor loaded"
    );
    Ok(descriptor)
}

/// Build the typed model (call after validate).
fn resolve(config: DescriptorConfig, document: serde_json::Value) -> Descriptor {
    let type_descriptors = config
        .type_descriptors
        .into_iter()
        .map(resolve_type_descriptor)
        .collect();
    Descriptor {
        key: config.key,
        name: config.name,
        description: config.description,
        version: config.version,
        protocol_version: config.protocol_version,
        type_descriptors,
        document,
    }
}

fn resolve_type_descriptor(td: TypeDescriptorConfig) -> TypeDescriptor {
    TypeDescriptor {
        key: td.key,
        name: td.name,
        table_name: td.table_name,
        unique_id_column: td.unique_id_column,
        column_as_option_name: td.column_as_option_name,
        options_available: td.options_available,
        fetch_one_available: td.fetch_one_available,
        fields: td.fields.into_iter().map(resolve_field).collect(),
    }
}

fn resolve_field(field: FieldConfig) -> Field {
    let workflow_type = workflow_type(&field.key, &field.type_);
    Field {
        from_column: non_empty(field.from_column),
        relationship: field.relationship.map(|r| Relationship {
            kind: r.kind,
            with_table: r.with_table,
            foreign_unique_id_column: r.foreign_table_unique_id_column,
            local_unique_id_column: r.local_table_unique_id_column,
        }),
        key: field.key,
        name: field.name,
        type_name: field.type_.name,
        workflow_type,
    }
}

fn workflow_type(field_key: &str, ty: &WorkflowTypeConfig) -> WorkflowType {
    if ty.name == MONEY_TYPE {
        let amount = ty.amount.clone().unwrap_or_default();
        let currency = ty.currency.clone().unwrap_or_default();
        return WorkflowType::Money(Money {
            amount_key: non_empty(amount.key).unwrap_or_else(|| field_key.to_string()),
            amount_column: amount.from_column,
            currency_key: non_empty(currency.key),
            currency_column: non_empty(currency.from_column),
            currency_value: non_empty(currency.value),
        });
    }
    match ty.kind.as_str() {
        "datetime" => return WorkflowType::DateTime,
        "date" => return WorkflowType::Date,
        "time" => return WorkflowType::Time,
        _ => {}
    }
    match ty.name.as_str() {
        "text" => WorkflowType::Text {
            multi_line: ty.multi_line,
        },
        "choice" => WorkflowType::Choice(ty.options.clone()),
        _ if !ty.options.is_empty() => WorkflowType::Choice(ty.options.clone()),
        other => WorkflowType::Other(other.to_string()),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
