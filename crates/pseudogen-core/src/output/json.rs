use std::io::Write;

use indexmap::IndexMap;

use crate::error::{PseudoGenError, Result};
use crate::generate::GeneratedTable;
use crate::output::json_value;

/// Write a table as a JSON array of row objects, one row at a time.
///
/// Keys follow column order. If two columns share a name the later one wins
/// in that row object, as it would in the service's preview response.
pub fn write_json<W: Write>(writer: &mut W, table: &GeneratedTable) -> Result<()> {
    write_str(writer, "[")?;
    for row in 0..table.row_count {
        let object: IndexMap<String, serde_json::Value> = table
            .columns
            .iter()
            .map(|c| {
                let cell = c.values.get(row).map(json_value).unwrap_or_default();
                (c.name.clone(), cell)
            })
            .collect();
        let encoded = serde_json::to_string(&object).map_err(|e| PseudoGenError::Other(
            format!("encoding JSON row {}: {}", row + 1, e),
        ))?;
        let sep = if row == 0 { "\n  " } else { ",\n  " };
        write_str(writer, sep)?;
        write_str(writer, &encoded)?;
    }
    write_str(writer, if table.row_count == 0 { "]\n" } else { "\n]\n" })
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer
        .write_all(s.as_bytes())
        .map_err(|e| PseudoGenError::Output {
            message: "writing JSON".to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{GeneratedColumn, Value};

    #[test]
    fn test_write_json_rows() {
        let table = GeneratedTable {
            columns: vec![
                GeneratedColumn {
                    name: "id".into(),
                    values: vec![Value::Int(1), Value::Int(2)],
                },
                GeneratedColumn {
                    name: "note".into(),
                    values: vec![Value::String("a \"b\"".into()), Value::Null],
                },
            ],
            row_count: 2,
        };
        let mut out = Vec::new();
        write_json(&mut out, &table).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["note"], "a \"b\"");
        assert!(parsed[1]["note"].is_null());
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_table_is_empty_array() {
        let mut out = Vec::new();
        write_json(&mut out, &GeneratedTable::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]\n");
    }
}
