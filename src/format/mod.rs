//! Shapes decoded rows into the JSON the workflow client expects.
//! Relationships are resolved recursively down to a fixed depth.

mod rows;

pub use rows::{assemble, plain};

use crate::descriptor::{Descriptor, Field, RelationshipKind, TypeDescriptor, WorkflowType};
use crate::error::FormatError;
use crate::value::{Record, Value};
use chrono::Utc;
use indexmap::IndexMap;

/// Levels of related resources resolved below the requested one.
pub const RELATIONSHIP_DEPTH: usize = 1;
/// Option lists never return more entries than this.
pub const OPTIONS_LIMIT: usize = 42;
pub const DEFAULT_CURRENCY: &str = "EUR";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Single,
    Collection,
    SingleOption,
    OptionCollection,
}

/// One base row plus, per relationship field key, its related sub-records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceRow {
    pub table: String,
    pub columns: Record,
    pub related: IndexMap<String, Vec<Record>>,
}

impl ResourceRow {
    pub fn new(table: impl Into<String>, columns: Record) -> Self {
        ResourceRow {
            table: table.into(),
            columns,
            related: IndexMap::new(),
        }
    }
}

pub struct Formatter<'a> {
    descriptor: &'a Descriptor,
    denormalize: bool,
    depth: usize,
}

impl<'a> Formatter<'a> {
    pub fn new(descriptor: &'a Descriptor) -> Self {
        Formatter {
            descriptor,
            denormalize: false,
            depth: RELATIONSHIP_DEPTH,
        }
    }

    /// Embed related resources instead of their ids.
    pub fn denormalize(mut self, denormalize: bool) -> Self {
        self.denormalize = denormalize;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn format(&self, shape: Shape, rows: &[ResourceRow]) -> Result<Value, FormatError> {
        match shape {
            Shape::Single => match rows {
                [] => Ok(Value::Object(Record::new())),
                [row] => Ok(Value::Object(self.resource_row(row, self.depth)?)),
                _ => {
                    let mut out = Vec::with_capacity(rows.len());
                    for row in rows {
                        out.push(Value::Object(self.resource_row(row, self.depth)?));
                    }
                    Ok(Value::Array(out))
                }
            },
            Shape::Collection => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    out.push(Value::Object(self.resource_row(row, 0)?));
                }
                Ok(Value::Array(out))
            }
            Shape::SingleOption => match rows {
                [] => Ok(Value::Object(Record::new())),
                [row] => self.option(row),
                _ => Err(FormatError::TooManyRows {
                    table: rows[0].table.clone(),
                    count: rows.len(),
                }),
            },
            Shape::OptionCollection => {
                let mut out = Vec::with_capacity(rows.len().min(OPTIONS_LIMIT));
                for row in rows.iter().take(OPTIONS_LIMIT) {
                    out.push(self.option(row)?);
                }
                Ok(Value::Array(out))
            }
        }
    }

    fn type_descriptor(&self, table: &str) -> Result<&'a TypeDescriptor, FormatError> {
        self.descriptor
            .type_descriptor_by_table(table)
            .ok_or_else(|| FormatError::UnknownTable(table.to_string()))
    }

    fn resource_row(&self, row: &ResourceRow, depth: usize) -> Result<Record, FormatError> {
        let td = self.type_descriptor(&row.table)?;
        self.resource(td, &row.columns, &row.related, depth)
    }

    fn resource(
        &self,
        td: &TypeDescriptor,
        columns: &Record,
        related: &IndexMap<String, Vec<Record>>,
        depth: usize,
    ) -> Result<Record, FormatError> {
        let mut out = Record::new();
        for field in &td.fields {
            if field.is_relationship() {
                if depth > 0 {
                    let value = self.relationship(field, related, depth)?;
                    out.insert(field.key.clone(), value);
                }
                continue;
            }
            let (key, value) = scalar_field(td, field, columns);
            out.insert(key, value);
        }
        Ok(out)
    }

    fn relationship(
        &self,
        field: &Field,
        related: &IndexMap<String, Vec<Record>>,
        depth: usize,
    ) -> Result<Value, FormatError> {
        let Some(rel) = field.relationship.as_ref() else {
            return Ok(Value::Null);
        };
        let related_td = self.type_descriptor(&rel.with_table)?;
        let sub_records = related.get(&field.key).map(Vec::as_slice).unwrap_or(&[]);
        let no_relations = IndexMap::new();

        let mut items = Vec::with_capacity(sub_records.len());
        for record in sub_records {
            let resolved = self.resource(related_td, record, &no_relations, depth - 1)?;
            if self.denormalize {
                items.push(Value::Object(resolved));
            } else {
                items.push(resolved.get("id").cloned().unwrap_or(Value::Null));
            }
        }

        Ok(match rel.kind {
            RelationshipKind::OneToMany => Value::Array(items),
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => items.into_iter().next().unwrap_or(Value::Null),
        })
    }

    fn option(&self, row: &ResourceRow) -> Result<Value, FormatError> {
        let td = self.type_descriptor(&row.table)?;
        let mut out = Record::new();
        out.insert("id".into(), column(&row.columns, &td.unique_id_column).stringify());
        out.insert("name".into(), column(&row.columns, &td.column_as_option_name).stringify());
        Ok(Value::Object(out))
    }
}

fn column(columns: &Record, name: &str) -> Value {
    columns.get(name).cloned().unwrap_or(Value::Null)
}

/// Output key and value of a non-relationship field.
fn scalar_field(td: &TypeDescriptor, field: &Field, columns: &Record) -> (String, Value) {
    if let Some(from) = field.from_column.as_deref() {
        if from == td.unique_id_column {
            return ("id".into(), column(columns, from).stringify());
        }
        if from == td.column_as_option_name {
            return ("name".into(), column(columns, from).stringify());
        }
    }
    let raw = field.from_column.as_deref().map(|c| column(columns, c)).unwrap_or(Value::Null);
    let value = match &field.workflow_type {
        WorkflowType::Money(money) => {
            let amount = column(columns, &money.amount_column);
            let currency = money.currency_column.as_deref().map(|c| column(columns, c)).unwrap_or(Value::Null);
            if amount.is_null() && currency.is_null() {
                Value::Null
            } else {
                let currency = if !currency.is_null() {
                    currency
                } else if let Some(v) = money.currency_value.as_deref() {
                    Value::from(v)
                } else {
                    Value::from(DEFAULT_CURRENCY)
                };
                let mut out = Record::new();
                out.insert("amount".into(), amount);
                out.insert("currency".into(), currency);
                Value::Object(out)
            }
        }
        WorkflowType::DateTime => match raw {
            Value::Timestamp(t) => Value::String(t.with_timezone(&Utc).format(DATE_FORMAT).to_string()),
            other => other,
        },
        // wall-clock value: a DATE read with a zone must not shift to another day
        WorkflowType::Date | WorkflowType::Time => match raw {
            Value::Timestamp(t) => Value::String(t.format(DATE_FORMAT).to_string()),
            other => other,
        },
        WorkflowType::Text { .. } => raw.stringify(),
        WorkflowType::Choice(_) | WorkflowType::Other(_) => raw,
    };
    (field.key.clone(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::load;
    use chrono::{DateTime, NaiveDate};
    use serde_json::json;

    const KITCHEN: &str = r#"{
        "key": "kitchen",
        "name": "Kitchen",
        "typeDescriptors": [
            {
                "key": "equipment",
                "tableName": "equipment",
                "columnAsOptionName": "name",
                "uniqueIdColumn": "id",
                "fields": [
                    { "key": "id", "fromColumn": "id", "type": { "name": "text" } },
                    { "key": "name", "fromColumn": "name", "type": { "name": "text" } },
                    {
                        "key": "acquisitionCost",
                        "type": {
                            "name": "money",
                            "amount": { "key": "acquisitionCost", "fromColumn": "acquisition_cost" }
                        }
                    },
                    { "key": "purchaseDate", "fromColumn": "purchase_date", "type": { "name": "date", "kind": "datetime" } },
                    {
                        "key": "recipes",
                        "type": { "name": "text" },
                        "relationship": {
                            "kind": "oneToMany",
                            "withTable": "recipes",
                            "localTableUniqueIdColumn": "id",
                            "foreignTableUniqueIdColumn": "equipment_id"
                        }
                    },
                    {
                        "key": "manual",
                        "type": { "name": "text" },
                        "relationship": {
                            "kind": "oneToOne",
                            "withTable": "manuals",
                            "localTableUniqueIdColumn": "id",
                            "foreignTableUniqueIdColumn": "equipment_id"
                        }
                    }
                ]
            },
            {
                "key": "recipes",
                "tableName": "recipes",
                "columnAsOptionName": "name",
                "uniqueIdColumn": "id",
                "fields": [
                    { "key": "id", "fromColumn": "id", "type": { "name": "text" } },
                    { "key": "name", "fromColumn": "name", "type": { "name": "text" } },
                    { "key": "equipmentId", "fromColumn": "equipment_id", "type": { "name": "number" } },
                    {
                        "key": "equipment",
                        "type": { "name": "text" },
                        "relationship": {
                            "kind": "manyToOne",
                            "withTable": "equipment",
                            "localTableUniqueIdColumn": "equipment_id",
                            "foreignTableUniqueIdColumn": "id"
                        }
                    }
                ]
            },
            {
                "key": "manuals",
                "tableName": "manuals",
                "columnAsOptionName": "name",
                "uniqueIdColumn": "id",
                "fields": [
                    { "key": "id", "fromColumn": "id", "type": { "name": "text" } },
                    { "key": "name", "fromColumn": "name", "type": { "name": "text" } },
                    { "key": "price", "type": { "name": "money",
                        "amount": { "key": "price", "fromColumn": "price" },
                        "currency": { "key": "currency", "fromColumn": "currency" } } },
                    { "key": "publishedOn", "fromColumn": "published_on", "type": { "name": "date", "kind": "date" } },
                    { "key": "pages", "fromColumn": "pages", "type": { "name": "number" } }
                ]
            }
        ]
    }"#;

    fn descriptor() -> Descriptor {
        load(KITCHEN.as_bytes()).unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn oven() -> ResourceRow {
        let purchased = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .fixed_offset();
        let mut row = ResourceRow::new(
            "equipment",
            record(&[
                ("id", Value::Integer(1)),
                ("name", Value::from("Oven")),
                ("acquisition_cost", Value::Float(500.0)),
                ("purchase_date", Value::Timestamp(purchased)),
            ]),
        );
        row.related.insert("recipes".into(), vec![]);
        row.related.insert("manual".into(), vec![]);
        row
    }

    fn recipe(id: i64, name: &str) -> Record {
        record(&[
            ("id", Value::Integer(id)),
            ("name", Value::from(name)),
            ("equipment_id", Value::Integer(1)),
        ])
    }

    #[test]
    fn formats_the_oven() {
        let d = descriptor();
        let out = Formatter::new(&d).format(Shape::Collection, &[oven()]).unwrap();
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"[{"id":"1","name":"Oven","acquisitionCost":{"amount":500,"currency":"EUR"},"purchaseDate":"2020-01-02T00:00:00.000Z"}]"#
        );
    }

    #[test]
    fn empty_results_per_shape() {
        let d = descriptor();
        let f = Formatter::new(&d);
        assert_eq!(f.format(Shape::Single, &[]).unwrap().to_json(), json!({}));
        assert_eq!(f.format(Shape::Collection, &[]).unwrap().to_json(), json!([]));
        assert_eq!(f.format(Shape::SingleOption, &[]).unwrap().to_json(), json!({}));
        assert_eq!(f.format(Shape::OptionCollection, &[]).unwrap().to_json(), json!([]));
    }

    #[test]
    fn single_nests_relationships_collection_strips_them() {
        let d = descriptor();
        let f = Formatter::new(&d);
        let single = f.format(Shape::Single, &[oven()]).unwrap().to_json();
        assert_eq!(single["recipes"], json!([]));
        assert_eq!(single["manual"], json!(null));

        let collection = f.format(Shape::Collection, &[oven(), oven()]).unwrap().to_json();
        for item in collection.as_array().unwrap() {
            assert!(item.get("recipes").is_none());
            assert!(item.get("manual").is_none());
        }
    }

    #[test]
    fn one_to_many_defaults_to_related_ids() {
        let d = descriptor();
        let mut row = oven();
        row.related.insert("recipes".into(), vec![recipe(7, "Bread")]);
        let out = Formatter::new(&d).format(Shape::Single, &[row]).unwrap().to_json();
        assert_eq!(out["recipes"], json!(["7"]));
    }

    #[test]
    fn denormalized_related_resources_stop_at_depth() {
        let d = descriptor();
        let mut row = oven();
        row.related.insert("recipes".into(), vec![recipe(7, "Bread"), recipe(8, "Pizza")]);
        let out = Formatter::new(&d).denormalize(true).format(Shape::Single, &[row]).unwrap().to_json();
        assert_eq!(
            out["recipes"],
            json!([
                { "id": "7", "name": "Bread", "equipmentId": 1 },
                { "id": "8", "name": "Pizza", "equipmentId": 1 }
            ])
        );
    }

    #[test]
    fn to_one_relationships_take_first_sub_record() {
        let d = descriptor();
        let published = DateTime::parse_from_rfc3339("2019-06-30T00:00:00+02:00").unwrap();
        let mut row = oven();
        row.related.insert(
            "manual".into(),
            vec![
                record(&[
                    ("id", Value::Integer(3)),
                    ("name", Value::from("Oven manual")),
                    ("price", Value::Float(12.5)),
                    ("currency", Value::from("USD")),
                    ("published_on", Value::Timestamp(published)),
                    ("pages", Value::Integer(40)),
                ]),
                record(&[("id", Value::Integer(4)), ("name", Value::from("Second"))]),
            ],
        );
        let out = Formatter::new(&d).denormalize(true).format(Shape::Single, &[row]).unwrap().to_json();
        assert_eq!(
            out["manual"],
            json!({
                "id": "3",
                "name": "Oven manual",
                "price": { "amount": 12.5, "currency": "USD" },
                "publishedOn": "2019-06-30T00:00:00.000Z",
                "pages": 40
            })
        );
    }

    #[test]
    fn depth_zero_omits_relationship_fields() {
        let d = descriptor();
        let out = Formatter::new(&d).depth(0).format(Shape::Single, &[oven()]).unwrap().to_json();
        assert!(out.get("recipes").is_none());
        assert_eq!(out["id"], json!("1"));
    }

    #[test]
    fn money_is_null_without_amount_or_currency() {
        let d = descriptor();
        let row = ResourceRow::new("manuals", record(&[("id", Value::Integer(3)), ("price", Value::Null)]));
        let out = Formatter::new(&d).format(Shape::Single, &[row]).unwrap().to_json();
        assert_eq!(out["price"], json!(null));
        assert_eq!(out["publishedOn"], json!(null));
    }

    #[test]
    fn money_falls_back_to_default_currency() {
        let d = descriptor();
        let row = ResourceRow::new(
            "manuals",
            record(&[("id", Value::Integer(3)), ("price", Value::Float(9.0)), ("currency", Value::Null)]),
        );
        let out = Formatter::new(&d).format(Shape::Single, &[row]).unwrap().to_json();
        assert_eq!(out["price"], json!({ "amount": 9, "currency": "EUR" }));
    }

    #[test]
    fn datetime_converts_to_utc_date_does_not() {
        let d = descriptor();
        let t = DateTime::parse_from_rfc3339("2020-01-02T00:30:00+01:00").unwrap();
        let row = ResourceRow::new(
            "equipment",
            record(&[("id", Value::Integer(1)), ("purchase_date", Value::Timestamp(t))]),
        );
        let out = Formatter::new(&d).format(Shape::Collection, &[row]).unwrap().to_json();
        assert_eq!(out[0]["purchaseDate"], json!("2020-01-01T23:30:00.000Z"));

        let row = ResourceRow::new(
            "manuals",
            record(&[("id", Value::Integer(3)), ("published_on", Value::Timestamp(t))]),
        );
        let out = Formatter::new(&d).format(Shape::Collection, &[row]).unwrap().to_json();
        assert_eq!(out[0]["publishedOn"], json!("2020-01-02T00:30:00.000Z"));
    }

    #[test]
    fn option_collection_is_capped_in_order() {
        let d = descriptor();
        let rows: Vec<ResourceRow> = (1..=100)
            .map(|i| ResourceRow::new("equipment", record(&[("id", Value::Integer(i)), ("name", Value::from(format!("item {i}")))])))
            .collect();
        let out = Formatter::new(&d).format(Shape::OptionCollection, &rows).unwrap().to_json();
        let items = out.as_array().unwrap();
        assert_eq!(items.len(), OPTIONS_LIMIT);
        assert_eq!(items[0], json!({ "id": "1", "name": "item 1" }));
        assert_eq!(items[41], json!({ "id": "42", "name": "item 42" }));
    }

    #[test]
    fn single_option_rejects_several_rows() {
        let d = descriptor();
        let row = ResourceRow::new("equipment", record(&[("id", Value::Integer(1)), ("name", Value::from("Oven"))]));
        let f = Formatter::new(&d);
        assert_eq!(f.format(Shape::SingleOption, &[row.clone()]).unwrap().to_json(), json!({ "id": "1", "name": "Oven" }));
        assert_eq!(
            f.format(Shape::SingleOption, &[row.clone(), row]).unwrap_err(),
            FormatError::TooManyRows {
                table: "equipment".into(),
                count: 2
            }
        );
    }

    #[test]
    fn unknown_tables_are_reported() {
        let d = descriptor();
        let row = ResourceRow::new("nowhere", Record::new());
        assert_eq!(
            Formatter::new(&d).format(Shape::Single, &[row]).unwrap_err(),
            FormatError::UnknownTable("nowhere".into())
        );
    }
}
