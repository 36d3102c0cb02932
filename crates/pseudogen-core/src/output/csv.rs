use std::io::Write;

use crate::error::{PseudoGenError, Result};
use crate::generate::GeneratedTable;

/// Write a table as CSV: one header line, then one line per row.
pub fn write_csv<W: Write>(writer: &mut W, table: &GeneratedTable) -> Result<()> {
    let header = table
        .columns
        .iter()
        .map(|c| csv_escape(&c.name))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", header).map_err(|e| PseudoGenError::Output {
        message: "writing CSV header".to_string(),
        source: e,
    })?;

    for row in 0..table.row_count {
        let line = table
            .columns
            .iter()
            .map(|c| {
                c.values
                    .get(row)
                    .map(|v| csv_escape(&v.to_csv_string()))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", line).map_err(|e| PseudoGenError::Output {
            message: format!("writing CSV row {}", row + 1),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| PseudoGenError::Output {
        message: "flushing CSV output".to_string(),
        source: e,
    })
}

/// Escape a string for CSV: quote if it contains comma, quote, or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{GeneratedColumn, Value};

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_csv() {
        let table = GeneratedTable {
            columns: vec![
                GeneratedColumn {
                    name: "id".into(),
                    values: vec![Value::Int(1), Value::Int(2)],
                },
                GeneratedColumn {
                    name: "city, state".into(),
                    values: vec![Value::String("Austin, TX".into()), Value::Null],
                },
            ],
            row_count: 2,
        };
        let mut out = Vec::new();
        write_csv(&mut out, &table).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,\"city, state\"\n1,\"Austin, TX\"\n2,\n"
        );
    }
}
