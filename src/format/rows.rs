//! Turns positional decoded rows into resource rows.

use crate::database::DecodedRow;
use crate::error::FormatError;
use crate::format::ResourceRow;
use crate::schema::JoinSegment;
use crate::value::{Record, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Rows of a query without joins, one resource each.
pub fn plain(table: &str, rows: Vec<DecodedRow>) -> Vec<ResourceRow> {
    rows.into_iter()
        .map(|row| ResourceRow::new(table, row.into_iter().collect()))
        .collect()
}

fn segment(row: &[(String, Value)], seg: &JoinSegment) -> Record {
    row[seg.start..seg.start + seg.len]
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Identity of a related sub-record inside one resource: its unique id, else the whole record.
fn sub_key(sub: &Record, unique_id_column: &str) -> String {
    sub.get(unique_id_column)
        .and_then(Value::to_text)
        .unwrap_or_else(|| Value::Object(sub.clone()).to_json().to_string())
}

/// Group joined rows by the base unique id, first-seen order.
///
/// `layout[0]` is the base table; `layout[i + 1]` belongs to `relations[i]`, given as
/// (field key, unique id column of the related table). Duplicate sub-records from join
/// fan-out are kept once and a LEFT JOIN miss (all related columns NULL) adds nothing.
pub fn assemble(
    table: &str,
    unique_id_column: &str,
    layout: &[JoinSegment],
    relations: &[(&str, &str)],
    rows: Vec<DecodedRow>,
) -> Result<Vec<ResourceRow>, FormatError> {
    let expected: usize = layout.iter().map(|s| s.len).sum();
    let Some(base) = layout.first() else {
        return Ok(plain(table, rows));
    };

    let mut grouped: IndexMap<String, (ResourceRow, Vec<HashSet<String>>)> = IndexMap::new();
    for (n, row) in rows.into_iter().enumerate() {
        if row.len() != expected {
            return Err(FormatError::LayoutMismatch {
                table: table.to_string(),
                expected,
                found: row.len(),
            });
        }
        let columns = segment(&row, base);
        let key = columns
            .get(unique_id_column)
            .and_then(|v| v.to_text())
            .unwrap_or_else(|| format!("#{}", n));

        let (resource, seen) = grouped.entry(key).or_insert_with(|| {
            let mut r = ResourceRow::new(table, columns);
            for (field_key, _) in relations {
                r.related.insert(field_key.to_string(), Vec::new());
            }
            (r, vec![HashSet::new(); relations.len()])
        });

        for ((seg, (field_key, related_uid)), seen) in layout[1..].iter().zip(relations).zip(seen.iter_mut()) {
            let sub = segment(&row, seg);
            if sub.values().all(|v| v.is_null()) {
                continue;
            }
            if seen.insert(sub_key(&sub, related_uid)) {
                resource.related.entry(field_key.to_string()).or_default().push(sub);
            }
        }
    }
    Ok(grouped.into_values().map(|(r, _)| r).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Vec<JoinSegment> {
        vec![
            JoinSegment {
                table: "equipment".into(),
                start: 0,
                len: 2,
            },
            JoinSegment {
                table: "recipes".into(),
                start: 2,
                len: 2,
            },
            JoinSegment {
                table: "manuals".into(),
                start: 4,
                len: 1,
            },
        ]
    }

    fn row(values: [Value; 5]) -> DecodedRow {
        let names = ["id", "name", "id", "name", "id"];
        names.iter().map(|n| n.to_string()).zip(values).collect()
    }

    #[test]
    fn groups_fan_out_by_base_id() {
        let rows = vec![
            row([Value::Integer(1), "Oven".into(), Value::Integer(7), "Bread".into(), Value::Integer(3)]),
            row([Value::Integer(1), "Oven".into(), Value::Integer(8), "Pizza".into(), Value::Integer(3)]),
            row([Value::Integer(2), "Mixer".into(), Value::Null, Value::Null, Value::Null]),
        ];
        let out = assemble("equipment", "id", &layout(), &[("recipes", "id"), ("manual", "id")], rows).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].columns["name"], Value::from("Oven"));
        assert_eq!(out[0].related["recipes"].len(), 2);
        assert_eq!(out[0].related["manual"].len(), 1, "fan-out duplicates are kept once");
        assert!(out[1].related["recipes"].is_empty(), "LEFT JOIN misses add nothing");
        assert!(out[1].related["manual"].is_empty());
    }

    #[test]
    fn related_rows_are_deduplicated_by_their_unique_id() {
        let rows = vec![
            row([Value::Integer(1), "Oven".into(), Value::Integer(7), "Bread".into(), Value::Integer(3)]),
            row([Value::Integer(1), "Oven".into(), Value::Integer(7), "Bread v2".into(), Value::Integer(4)]),
            row([Value::Integer(1), "Oven".into(), Value::Null, "Unsaved".into(), Value::Integer(4)]),
            row([Value::Integer(1), "Oven".into(), Value::Null, "Unsaved".into(), Value::Integer(3)]),
        ];
        let out = assemble("equipment", "id", &layout(), &[("recipes", "id"), ("manual", "id")], rows).unwrap();
        let recipes: Vec<&Value> = out[0].related["recipes"].iter().map(|r| &r["name"]).collect();
        assert_eq!(recipes, vec![&Value::from("Bread"), &Value::from("Unsaved")]);
        assert_eq!(out[0].related["manual"].len(), 2);
    }

    #[test]
    fn short_rows_are_rejected() {
        let rows = vec![vec![("id".to_string(), Value::Integer(1))]];
        let err = assemble("equipment", "id", &layout(), &[("recipes", "id"), ("manual", "id")], rows).unwrap_err();
        assert_eq!(
            err,
            FormatError::LayoutMismatch {
                table: "equipment".into(),
                expected: 5,
                found: 1
            }
        );
    }
}
