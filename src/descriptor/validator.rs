//! Descriptor validation: stops at the first violated rule.

use crate::descriptor::{DescriptorConfig, FieldConfig, TypeDescriptorConfig};
use crate::error::DescriptorError;
use std::collections::HashSet;

pub const MONEY_TYPE: &str = "money";

pub fn validate(config: &DescriptorConfig) -> Result<(), DescriptorError> {
    let tables: HashSet<&str> = config
        .type_descriptors
        .iter()
        .map(|td| td.table_name.as_str())
        .collect();

    for td in &config.type_descriptors {
        unique_id_column_is_id(td)?;
        option_name_column_is_name(td)?;
        for field in &td.fields {
            currency_has_single_source(td, field)?;
            from_column_is_present(field)?;
            type_name_is_present(field)?;
            money_has_amount_column(td, field)?;
            relationship_targets_known_table(td, field, &tables)?;
        }
    }
    Ok(())
}

fn unique_id_column_is_id(td: &TypeDescriptorConfig) -> Result<(), DescriptorError> {
    if td.fields.iter().any(|f| f.key == "id") && td.unique_id_column != "id" {
        return Err(DescriptorError::Validation(format!(
            "the `uniqueIdColumn` property for type descriptor `{}` must be set to `id` \
             when the type descriptor contains a field called `id`",
            td.key
        )));
    }
    Ok(())
}

fn option_name_column_is_name(td: &TypeDescriptorConfig) -> Result<(), DescriptorError> {
    if td.fields.iter().any(|f| f.key == "name") && td.column_as_option_name != "name" {
        return Err(DescriptorError::Validation(format!(
            "the `columnAsOptionName` property for type descriptor `{}` must be set to `name` \
             when the type descriptor contains a field called `name`",
            td.key
        )));
    }
    Ok(())
}

fn currency_has_single_source(td: &TypeDescriptorConfig, field: &FieldConfig) -> Result<(), DescriptorError> {
    if field.type_.name != MONEY_TYPE {
        return Ok(());
    }
    let Some(currency) = &field.type_.currency else {
        return Ok(());
    };
    if !currency.value.is_empty() && !currency.from_column.is_empty() {
        return Err(DescriptorError::Validation(format!(
            "{}.{} specifies a default currency value *and* a fromColumn; specify only one",
            td.key, field.key
        )));
    }
    Ok(())
}

fn from_column_is_present(field: &FieldConfig) -> Result<(), DescriptorError> {
    if field.type_.name != MONEY_TYPE && field.relationship.is_none() && field.from_column.is_empty() {
        return Err(DescriptorError::Validation(format!(
            "field `{}` of type '{}' should contain a fromColumn property",
            field.key, field.type_.name
        )));
    }
    Ok(())
}

fn type_name_is_present(field: &FieldConfig) -> Result<(), DescriptorError> {
    if field.type_.name.is_empty() {
        return Err(DescriptorError::Validation(format!(
            "field `{}` should not have an empty type name",
            field.key
        )));
    }
    Ok(())
}

fn money_has_amount_column(td: &TypeDescriptorConfig, field: &FieldConfig) -> Result<(), DescriptorError> {
    if field.type_.name != MONEY_TYPE {
        return Ok(());
    }
    let has_amount = field
        .type_
        .amount
        .as_ref()
        .is_some_and(|a| !a.from_column.is_empty());
    if !has_amount {
        return Err(DescriptorError::Validation(format!(
            "{}.{} is of type money but has no amount.fromColumn",
            td.key, field.key
        )));
    }
    Ok(())
}

fn relationship_targets_known_table(
    td: &TypeDescriptorConfig,
    field: &FieldConfig,
    tables: &HashSet<&str>,
) -> Result<(), DescriptorError> {
    let Some(rel) = &field.relationship else {
        return Ok(());
    };
    if !tables.contains(rel.with_table.as_str()) {
        return Err(DescriptorError::Validation(format!(
            "{}.{} references table `{}` which no type descriptor declares",
            td.key, field.key, rel.with_table
        )));
    }
    Ok(())
}
