//! # Output Writers
//!
//! Serializes a `GeneratedTable` to CSV or JSON, and converts it into the
//! same `PreviewResult` shape the generator service returns, so local
//! samples and remote previews render identically.

pub mod csv;
pub mod json;

use indexmap::IndexMap;

use crate::generate::{GeneratedTable, Value};
use crate::wire::{PreviewResult, Shape};

/// Convert a cell into a JSON value. Non-finite floats become null.
pub fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
    }
}

/// Build a preview of the first `limit` rows of a locally generated table.
pub fn preview_result(table: &GeneratedTable, limit: usize) -> PreviewResult {
    let shown = table.row_count.min(limit);
    let rows = (0..shown)
        .map(|row| {
            table
                .columns
                .iter()
                .map(|c| {
                    let cell = c.values.get(row).map(json_value).unwrap_or_default();
                    (c.name.clone(), cell)
                })
                .collect::<IndexMap<_, _>>()
        })
        .collect();

    PreviewResult {
        rows,
        column_names: table.columns.iter().map(|c| c.name.clone()).collect(),
        shape: Shape {
            rows: table.row_count,
            columns: table.columns.len(),
        },
        message: format!("Preview of {} of {} rows", shown, table.row_count),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GeneratedColumn;

    #[test]
    fn test_preview_result_limits_rows() {
        let table = GeneratedTable {
            columns: vec![
                GeneratedColumn {
                    name: "id".into(),
                    values: (1..=30).map(Value::Int).collect(),
                },
                GeneratedColumn {
                    name: "price".into(),
                    values: vec![Value::Float(f64::NAN); 30],
                },
            ],
            row_count: 30,
        };
        let preview = preview_result(&table, 25);
        assert_eq!(preview.rows.len(), 25);
        assert_eq!(preview.shape, Shape { rows: 30, columns: 2 });
        assert_eq!(preview.rows[0]["id"], serde_json::json!(1));
        assert!(preview.rows[0]["price"].is_null());
        assert_eq!(preview.column_names, vec!["id", "price"]);
    }
}
